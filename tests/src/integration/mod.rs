//! Cross-crate flows: sw-02 client → sw-01 transport → sw-04 server → sw-03 sessions.

pub mod harness;

#[cfg(test)]
mod directory;
#[cfg(test)]
mod lifecycle;
#[cfg(test)]
mod paging;
