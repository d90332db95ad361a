//! Client core for Collab Zone: a rich-text document model with its command
//! layer, the HTTP sync client for the document API, and the controllers that
//! keep the owned/shared document lists and sharing in step with the server.

pub mod command_bar;
pub mod config;
pub mod document;
pub mod documents;
pub mod editor;
pub mod editor_display;
pub mod error;
pub mod logging;
pub mod markup;
pub mod render;
pub mod share;
pub mod status;
pub mod sync;
pub mod theme;
