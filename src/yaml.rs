//! Multi-document YAML stream splitting
//!
//! Splits a raw byte stream into individual document blobs on `---`
//! separator lines, without parsing the documents themselves. Parsing and
//! typed decoding happen later, in parallel, inside the pipeline workers.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Splitter over a multi-document YAML stream
///
/// Yields one raw document string per call to [`next_document`], skipping
/// documents that contain only whitespace.
///
/// [`next_document`]: DocumentSplitter::next_document
pub struct DocumentSplitter<R> {
    reader: R,
    done: bool,
}

impl<R: AsyncBufRead + Unpin> DocumentSplitter<R> {
    /// Create a splitter over the given buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }

    /// Read the next document, or `None` at end of stream
    pub async fn next_document(&mut self) -> std::io::Result<Option<String>> {
        if self.done {
            return Ok(None);
        }

        let mut document = String::new();
        let mut line = String::new();

        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await?;

            if read == 0 {
                self.done = true;
                if document.trim().is_empty() {
                    return Ok(None);
                }
                return Ok(Some(document));
            }

            if is_separator(&line) {
                if document.trim().is_empty() {
                    // leading or repeated separator, keep scanning
                    document.clear();
                    continue;
                }
                return Ok(Some(document));
            }

            document.push_str(&line);
        }
    }
}

/// A separator is a line consisting of exactly `---`
fn is_separator(line: &str) -> bool {
    line.trim_end() == "---"
}
