pub mod positioning; // Field positioning & conflict resolution
