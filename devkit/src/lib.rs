/*!
# coconutbar DevKit - Fixtures pour les tests

Bibliothèque facilitant les tests de coconutbar sans matériel réel:
- Arborescences procfs/sysfs factices dans un répertoire temporaire
- Tampon partagé pour capturer la sortie de la barre
- Abonnés scriptés remplaçant `bspc subscribe`
*/

pub mod buffer;
pub mod procfs;
pub mod subscriber;

pub use buffer::SharedBuffer;
pub use procfs::ProcFixture;
pub use subscriber::{scripted_subscriber, silent_subscriber};

/// Active les logs pendant les tests (idempotent)
pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}
