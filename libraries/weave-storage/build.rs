//! Embedded migrations are read at compile time by `sqlx::migrate!`, so a
//! new or edited file under `migrations/` must rebuild the crate.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
