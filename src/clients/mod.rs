pub mod exam_creator_client;
pub mod exam_store;

pub use exam_creator_client::ExamCreatorClient;
pub use exam_store::{ExamGenerator, ExamStore};
