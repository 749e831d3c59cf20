pub mod card;
pub mod device;
pub mod discover;
pub mod framebuffer;
pub mod session;

#[cfg(test)]
pub(crate) mod fake;
