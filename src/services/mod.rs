pub mod qa_service;
pub mod translation_service;
pub mod upload_service;

pub use qa_service::{
    Answer, QaMode, QaOutcome, QaReply, QaSession, QaTicket, Transcript, Turn, TurnId, GREETING,
};
pub use translation_service::{
    canonical_language, language_label, LanguageTab, Selection, TranslationCache,
    TranslationOutcome, TranslationState, TranslationSwitcher, TranslationTicket,
    ORIGINAL_LANGUAGE,
};
pub use upload_service::{UploadCoordinator, UploadFailure, UploadOutcome, UploadTicket};
