use std::io::Write;

use crate::arena::LogBuffer;
use crate::decode::DecodedEntry;
use crate::error::{DecodeError, FlushError};
use crate::format;
use crate::ring::{Renderer, TemplateTable};

/// Formats entries as `<timestamp> <message>` lines.
pub struct TextRenderer<W: Write> {
    out: W,
    line: String,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        TextRenderer {
            out,
            line: String::with_capacity(256),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_entry(
        &mut self,
        entry: &DecodedEntry,
        templates: &TemplateTable,
    ) -> Result<(), DecodeError> {
        let template = templates
            .get(entry.format_id)
            .ok_or(DecodeError::UnknownFormat(entry.format_id))?;

        self.line.clear();
        self.line.push_str(&entry.rendered_timestamp());
        self.line.push(' ');
        if let Err(err) = format::render_into(&mut self.line, template, &entry.values) {
            // Keep the entry visible even when its template is unusable.
            self.line.truncate(self.line.find(' ').map_or(0, |i| i + 1));
            self.line.push_str(template);
            self.line.push_str(" [format error: ");
            self.line.push_str(&err.to_string());
            self.line.push(']');
        }
        self.line.push('\n');
        Ok(())
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(
        &mut self,
        arena: &mut LogBuffer,
        templates: &TemplateTable,
    ) -> Result<usize, FlushError> {
        let mut n = 0;
        for entry in arena.entries() {
            let result = entry.and_then(|e| self.write_entry(&e, templates));
            match result {
                Ok(()) => {
                    self.out.write_all(self.line.as_bytes())?;
                    n += 1;
                }
                Err(err) => {
                    log::warn!("skipping rest of trace arena after {n} entries: {err}");
                    break;
                }
            }
        }
        self.out.flush()?;
        Ok(n)
    }
}

/// Copies the committed bytes of each arena verbatim.
pub struct RawRenderer<W: Write> {
    out: W,
}

impl<W: Write> RawRenderer<W> {
    pub fn new(out: W) -> Self {
        RawRenderer { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for RawRenderer<W> {
    fn render(
        &mut self,
        arena: &mut LogBuffer,
        _templates: &TemplateTable,
    ) -> Result<usize, FlushError> {
        self.out.write_all(arena.committed())?;
        self.out.flush()?;
        Ok(arena.entry_count())
    }
}
