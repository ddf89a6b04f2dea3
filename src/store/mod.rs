// SPDX-License-Identifier: GPL-3.0-only
pub mod file_store;
pub mod validator;

pub use file_store::{FileStore, PersistPolicy};
pub use validator::is_well_formed;
