pub(crate) mod blacklist;
pub(crate) mod catalog;
pub(crate) mod create;
pub(crate) mod limits;
pub(crate) mod meta;
pub(crate) mod shared;
pub(crate) mod sync;
pub(crate) mod verify;
