// ai
//! ✂️ splitter.rs — turning a blob of bytes into a polite queue of lines.
//!
//! A fetched object is one big `Vec<u8>`. The sink wants one record at a time.
//! In between sits this module, with `memchr` as its metal detector for `\n`.
//!
//! 🧠 Knowledge graph (the exact rules, because someone will ask at 3am):
//! - records end at `\n`; a `\r` right before it is dropped (Windows says hi)
//! - the last line counts even without a trailing `\n`
//! - a trailing `\n` at the very end does NOT summon an extra empty record
//! - empty lines in the middle ARE records (empty strings). They showed up. They count.
//! - empty content → zero records
//! - the whole object must be UTF-8, checked once up front. If it isn't, the
//!   object produces zero records and a [`SplitError`]. No half-objects. Ever. 🦆

use memchr::memchr_iter;
use thiserror::Error;

/// 🧹 The object's bytes are not text, so there are no lines to speak of.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("content is not valid UTF-8 (first bad byte at offset {valid_up_to})")]
pub struct SplitError {
    pub valid_up_to: usize,
}

/// 📜 Iterator over the records of one object's content. Borrows, never copies.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    text: &'a str,
    newlines: memchr::Memchr<'a>,
    cursor: usize,
    done: bool,
}

/// ✂️ Validate `content` as UTF-8 and hand back an iterator over its records.
pub fn split_records(content: &[u8]) -> Result<Records<'_>, SplitError> {
    let text = std::str::from_utf8(content).map_err(|e| SplitError {
        valid_up_to: e.valid_up_to(),
    })?;
    Ok(Records {
        text,
        newlines: memchr_iter(b'\n', text.as_bytes()),
        cursor: 0,
        done: text.is_empty(),
    })
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }
        match self.newlines.next() {
            Some(newline_at) => {
                let line = &self.text[self.cursor..newline_at];
                self.cursor = newline_at + 1;
                // -- 🏁 that newline was the last byte: no phantom empty record after it
                if self.cursor == self.text.len() {
                    self.done = true;
                }
                Some(strip_carriage_return(line))
            }
            None => {
                // -- 📄 unterminated final line. still a line. still loved.
                self.done = true;
                Some(strip_carriage_return(&self.text[self.cursor..]))
            }
        }
    }
}

#[inline]
fn strip_carriage_return(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(content: &str) -> Vec<&str> {
        split_records(content.as_bytes())
            .expect("💀 test content is UTF-8, the splitter should agree")
            .collect()
    }

    #[test]
    fn the_one_where_terminated_lines_come_out_in_order() {
        assert_eq!(lines_of("x\ny\n"), vec!["x", "y"]);
    }

    #[test]
    fn the_one_where_the_last_line_forgot_its_newline() {
        assert_eq!(lines_of("x\ny"), vec!["x", "y"]);
        assert_eq!(lines_of("solo"), vec!["solo"]);
    }

    #[test]
    fn the_one_where_empty_content_is_empty() {
        assert!(lines_of("").is_empty());
    }

    #[test]
    fn the_one_where_blank_lines_in_the_middle_still_count() {
        assert_eq!(lines_of("a\n\nb\n"), vec!["a", "", "b"]);
        assert_eq!(lines_of("\n"), vec![""]);
    }

    #[test]
    fn the_one_where_windows_line_endings_get_trimmed() {
        assert_eq!(lines_of("{\"a\":1}\r\n{\"b\":2}\r\n"), vec!["{\"a\":1}", "{\"b\":2}"]);
        // -- 🧐 only the \r hugging the \n goes. a lonely \r mid-line stays put.
        assert_eq!(lines_of("a\rb\n"), vec!["a\rb"]);
    }

    #[test]
    fn the_one_where_binary_garbage_is_refused_up_front() {
        let the_garbage = [b'o', b'k', b'\n', 0xff, 0xfe, b'\n'];
        let the_error = split_records(&the_garbage).expect_err("💀 0xff is not UTF-8, sorry");
        assert_eq!(the_error.valid_up_to, 3);
        assert!(the_error.to_string().contains("offset 3"));
    }

    #[test]
    fn the_one_where_multibyte_characters_survive_the_split() {
        assert_eq!(lines_of("héllo\n🦆\n"), vec!["héllo", "🦆"]);
    }
}
