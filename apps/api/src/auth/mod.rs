// Sessions, sign-in and the guest quota.
// Passwords are bcrypt-hashed off the async executor.

pub mod handlers;
pub mod session;
