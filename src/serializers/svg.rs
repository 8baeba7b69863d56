//! The SVG serializer: the DOT rendering piped through the `dot`
//! executable.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::Context;

use super::{dot, Serializer};
use crate::snapshot::GraphSnapshot;

pub struct SvgSerializer;

impl Serializer for SvgSerializer {
    fn mimetype(&self) -> &'static str {
        "image/svg+xml"
    }

    fn serialize(&self, graph: &GraphSnapshot) -> anyhow::Result<Vec<u8>> {
        render(&dot::to_dot(graph))
    }
}

pub fn render(dot_source: &str) -> anyhow::Result<Vec<u8>> {
    let mut child = Command::new("dot")
        .arg("-Tsvg")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to launch the dot executable")?;
    child
        .stdin
        .take()
        .context("no stdin handle for the dot executable")?
        .write_all(dot_source.as_bytes())?;
    let output = child.wait_with_output()?;
    anyhow::ensure!(output.status.success(), "dot exited with {}", output.status);
    Ok(output.stdout)
}
