//! Serializers turning a [`GraphSnapshot`] into bytes with a declared MIME
//! type, for the CLI and the live viewer.

pub mod dot;
pub mod hierarchy;
pub mod svg;
pub mod text;

use crate::snapshot::GraphSnapshot;

pub trait Serializer {
    fn mimetype(&self) -> &'static str;

    fn serialize(&self, graph: &GraphSnapshot) -> anyhow::Result<Vec<u8>>;
}

/// Look a serializer up by the file extension the viewer routes on.
pub fn by_extension(extension: &str) -> Option<Box<dyn Serializer + Send + Sync>> {
    match extension {
        "dot" => Some(Box::new(dot::DotSerializer)),
        "svg" => Some(Box::new(svg::SvgSerializer)),
        "txt" => Some(Box::new(text::TextSerializer)),
        _ => None,
    }
}
