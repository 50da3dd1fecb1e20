pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{
    BatchReport, CardEntry, MatchWarning, MatchWarningKind, PhotoAsset, PhotoMatch, PhotoStatus,
    RenderedCard, Roster, Side, StudentRecord, TransformResult,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
