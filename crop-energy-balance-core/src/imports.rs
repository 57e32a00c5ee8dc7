pub use anyhow::{anyhow, bail, ensure, Context};
pub use log;
pub use serde::{Deserialize, Serialize};
pub use std::collections::BTreeMap;
pub use std::ffi::OsStr;
pub use std::fs::File;
pub use std::path::{Path, PathBuf};
pub use validator::Validate;

pub use crate::traits::*;
pub use crate::utils::PRECISION;
