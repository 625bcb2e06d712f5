use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::models::{Font, TextColor};

/// Handle to an uploaded Telegram file, kept until the workflow's terminal
/// action downloads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub file_id: String,
    pub file_name: String,
}

impl FileRef {
    pub fn new(file_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: file_name.into(),
        }
    }
}

/// One variant per workflow step. Each variant carries exactly the data that
/// step has accumulated so far, so finishing or abandoning a workflow is a
/// single map removal and no stale keys can leak between workflows.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    AwaitingText,
    ChoosingFont {
        text: String,
    },
    ChoosingColor {
        text: String,
        font: Font,
    },
    ChoosingSize {
        text: String,
        font: Font,
        color: TextColor,
    },
    AwaitingImages {
        images: Vec<FileRef>,
    },
    ChoosingOrientation {
        images: Vec<FileRef>,
    },
    AwaitingOcrImages {
        images: Vec<FileRef>,
    },
    AwaitingDocument,
    AwaitingMergePdfs {
        pdfs: Vec<FileRef>,
    },
    AwaitingSplitPdf,
    AwaitingSplitPages {
        pdf_path: PathBuf,
        page_count: u32,
    },
    AwaitingProtectPdf,
    AwaitingPassword {
        pdf: FileRef,
    },
    AwaitingAiDocument,
    AwaitingMasterPassword,
    AwaitingBroadcastText,
}

impl WorkflowState {
    /// Short tag for log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            WorkflowState::AwaitingText => "awaiting_text",
            WorkflowState::ChoosingFont { .. } => "choosing_font",
            WorkflowState::ChoosingColor { .. } => "choosing_color",
            WorkflowState::ChoosingSize { .. } => "choosing_size",
            WorkflowState::AwaitingImages { .. } => "awaiting_images",
            WorkflowState::ChoosingOrientation { .. } => "choosing_orientation",
            WorkflowState::AwaitingOcrImages { .. } => "awaiting_ocr_images",
            WorkflowState::AwaitingDocument => "awaiting_document",
            WorkflowState::AwaitingMergePdfs { .. } => "awaiting_merge_pdfs",
            WorkflowState::AwaitingSplitPdf => "awaiting_split_pdf",
            WorkflowState::AwaitingSplitPages { .. } => "awaiting_split_pages",
            WorkflowState::AwaitingProtectPdf => "awaiting_protect_pdf",
            WorkflowState::AwaitingPassword { .. } => "awaiting_password",
            WorkflowState::AwaitingAiDocument => "awaiting_ai_document",
            WorkflowState::AwaitingMasterPassword => "awaiting_master_password",
            WorkflowState::AwaitingBroadcastText => "awaiting_broadcast_text",
        }
    }

    /// Disk artifact this state owns, if any. A displaced state's file must
    /// be deleted by the caller; it will never be reachable again.
    pub fn owned_file(&self) -> Option<&Path> {
        match self {
            WorkflowState::AwaitingSplitPages { pdf_path, .. } => Some(pdf_path),
            _ => None,
        }
    }
}

/// In-memory per-chat session store. One workflow state per chat at most;
/// setting overwrites, clearing terminates. Lives for the process lifetime,
/// no persistence.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<ChatId, WorkflowState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Unconditional overwrite. Entering a workflow mid-another simply
    /// replaces the old state; workflows never nest. Returns the displaced
    /// state so the caller can release any files it owned.
    pub async fn set(&self, chat_id: ChatId, state: WorkflowState) -> Option<WorkflowState> {
        log::debug!("chat {} -> state {}", chat_id, state.tag());
        self.sessions.lock().await.insert(chat_id, state)
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<WorkflowState> {
        self.sessions.lock().await.get(&chat_id).cloned()
    }

    /// Remove and return the state in one step. Terminal actions use this so
    /// the session is gone before any long-running conversion starts.
    pub async fn take(&self, chat_id: ChatId) -> Option<WorkflowState> {
        self.sessions.lock().await.remove(&chat_id)
    }

    /// Fully terminate the chat's workflow. Returns the removed state so the
    /// caller can release any files it owned.
    pub async fn clear(&self, chat_id: ChatId) -> Option<WorkflowState> {
        let removed = self.sessions.lock().await.remove(&chat_id);
        if removed.is_some() {
            log::debug!("chat {} session cleared", chat_id);
        }
        removed
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(n: u32) -> FileRef {
        FileRef::new(format!("id{n}"), format!("f{n}.pdf"))
    }

    #[tokio::test]
    async fn get_returns_last_set_until_clear() {
        let store = SessionStore::new();
        let chat = ChatId(1);

        assert_eq!(store.get(chat).await, None);

        store.set(chat, WorkflowState::AwaitingText).await;
        assert_eq!(store.get(chat).await, Some(WorkflowState::AwaitingText));

        store.set(chat, WorkflowState::AwaitingSplitPdf).await;
        assert_eq!(store.get(chat).await, Some(WorkflowState::AwaitingSplitPdf));

        store.clear(chat).await;
        assert_eq!(store.get(chat).await, None);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_chat() {
        let store = SessionStore::new();
        store.set(ChatId(1), WorkflowState::AwaitingText).await;
        store.set(ChatId(2), WorkflowState::AwaitingDocument).await;

        store.clear(ChatId(1)).await;
        assert_eq!(store.get(ChatId(1)).await, None);
        assert_eq!(
            store.get(ChatId(2)).await,
            Some(WorkflowState::AwaitingDocument)
        );
        assert_eq!(store.active_count().await, 1);
    }

    #[tokio::test]
    async fn overwrite_and_clear_hand_back_the_displaced_state() {
        let store = SessionStore::new();
        let chat = ChatId(9);
        let split = WorkflowState::AwaitingSplitPages {
            pdf_path: PathBuf::from("/tmp/split_x.pdf"),
            page_count: 7,
        };

        assert_eq!(store.set(chat, split.clone()).await, None);
        let displaced = store.set(chat, WorkflowState::AwaitingText).await;
        assert_eq!(displaced, Some(split));
        assert_eq!(
            displaced.unwrap().owned_file(),
            Some(Path::new("/tmp/split_x.pdf"))
        );

        assert_eq!(
            store.clear(chat).await,
            Some(WorkflowState::AwaitingText)
        );
        assert_eq!(store.clear(chat).await, None);
    }

    #[tokio::test]
    async fn take_removes_the_session() {
        let store = SessionStore::new();
        let chat = ChatId(7);
        store
            .set(chat, WorkflowState::AwaitingPassword { pdf: file(1) })
            .await;

        let taken = store.take(chat).await;
        assert_eq!(
            taken,
            Some(WorkflowState::AwaitingPassword { pdf: file(1) })
        );
        assert_eq!(store.get(chat).await, None);
    }

    #[tokio::test]
    async fn image_accumulator_preserves_upload_order() {
        let store = SessionStore::new();
        let chat = ChatId(3);
        store
            .set(chat, WorkflowState::AwaitingImages { images: vec![] })
            .await;

        for n in 1..=3 {
            let state = store.get(chat).await.unwrap();
            if let WorkflowState::AwaitingImages { mut images } = state {
                images.push(file(n));
                store.set(chat, WorkflowState::AwaitingImages { images }).await;
            } else {
                panic!("unexpected state");
            }
        }

        match store.get(chat).await.unwrap() {
            WorkflowState::AwaitingImages { images } => {
                assert_eq!(images.len(), 3);
                assert_eq!(images, vec![file(1), file(2), file(3)]);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn entering_a_workflow_resets_a_stale_accumulator() {
        let store = SessionStore::new();
        let chat = ChatId(4);
        store
            .set(
                chat,
                WorkflowState::AwaitingMergePdfs {
                    pdfs: vec![file(1), file(2)],
                },
            )
            .await;

        // Re-entry constructs a fresh variant, so the old list is gone.
        store
            .set(chat, WorkflowState::AwaitingMergePdfs { pdfs: vec![] })
            .await;
        match store.get(chat).await.unwrap() {
            WorkflowState::AwaitingMergePdfs { pdfs } => assert!(pdfs.is_empty()),
            other => panic!("unexpected state {other:?}"),
        }
    }
}
