#![forbid(unsafe_code)]

mod manager;
mod uid;
mod universe;

pub use manager::{DYNAMIC_SIGN_INDEX, ManagerEvent, ManagerRole, SignatureIndex};
pub use uid::{MAX_PACKAGE_NAME, PER_USER_RANGE, Uid, UidRecord, valid_package_name};
pub use universe::UidUniverse;
