//! Presenter-side components.

pub mod explorer;

pub use explorer::{
    DirectoryPane, DirectoryPaneBuilder, ErrorCallback, ListViewHandle, ListViewState,
    RenderCallback,
};
