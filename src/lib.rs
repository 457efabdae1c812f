pub mod error;
pub mod staging_dir;

pub use crate::{
    error::{Error, Result},
    staging_dir::{Placement, StagingDir},
};
