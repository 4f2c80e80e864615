pub mod firebase;

// Re-export the module-level API
pub use firebase::FirebaseScanner;
