//! Text log formats understood by [`SeekableTextSource`](super::SeekableTextSource)

use super::text::LineReader;
use crate::commit::{Colour, Commit, FileAction};
use crate::filters::Filters;
use crate::sanitize::filter_utf8;
use regex::Regex;
use std::sync::LazyLock;

/// Parses one commit's worth of lines at a time
pub trait LogFormat: Send {
    fn name(&self) -> &'static str;

    /// First byte every log in this format starts with, if it has one
    fn first_char(&self) -> Option<u8> {
        None
    }

    /// Parse the next commit. `None` means no commit could be read from the
    /// lines consumed by this call.
    fn parse_commit(&self, lines: &mut LineReader, filters: &Filters) -> Option<Commit>;
}

/// Pipe-delimited custom log: `timestamp|username|action|path[|#RRGGBB]`
///
/// Consecutive lines sharing a timestamp and username form one commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomFormat;

static CUSTOM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\x{FEFF}?([^|]+)\|([^|]*)\|([ADM]?)\|([^|]+)(?:\|#?([A-Fa-f0-9]{6}))?")
        .expect("custom log pattern is valid")
});

struct CustomEntry<'a> {
    timestamp: i64,
    username: &'a str,
    action: FileAction,
    path: &'a str,
    colour: Option<Colour>,
}

impl CustomFormat {
    fn parse_entry(line: &str) -> Option<CustomEntry<'_>> {
        let caps = CUSTOM_LINE.captures(line)?;
        let timestamp = caps.get(1)?.as_str().trim().parse().ok()?;
        let action = caps
            .get(3)
            .and_then(|m| m.as_str().chars().next())
            .and_then(FileAction::from_code)
            .unwrap_or(FileAction::Added);

        Some(CustomEntry {
            timestamp,
            username: caps.get(2).map_or("", |m| m.as_str()),
            action,
            path: caps.get(4)?.as_str(),
            colour: caps.get(5).and_then(|m| Colour::from_hex(m.as_str())),
        })
    }
}

impl LogFormat for CustomFormat {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn parse_commit(&self, lines: &mut LineReader, filters: &Filters) -> Option<Commit> {
        let mut commit: Option<Commit> = None;

        while let Some(line) = lines.next_line() {
            let Some(entry) = Self::parse_entry(&line) else {
                tracing::debug!("Skipping malformed custom log line: {}", line);
                break;
            };

            if let Some(c) = &commit
                && (c.timestamp != entry.timestamp || c.username != entry.username)
            {
                lines.push_back(line);
                break;
            }
            let current =
                commit.get_or_insert_with(|| Commit::new(entry.timestamp, entry.username));

            match entry.colour {
                Some(colour) => {
                    current.add_file_with_colour(entry.path, entry.action, colour, filters)
                }
                None => current.add_file(entry.path, entry.action, filters),
            };
        }

        commit.filter(|c| !c.files.is_empty())
    }
}

/// Raw git log produced by [`GitLogFormat::LOG_ARGS`]
///
/// ```text
/// user:Jane Doe
/// 1275543595
/// :000000 100644 0000000 5c2f1a1 A	src/main.rs
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GitLogFormat;

impl GitLogFormat {
    /// Arguments to `git` that produce this format
    pub const LOG_ARGS: &'static [&'static str] = &[
        "log",
        "--pretty=format:user:%aN%n%ct",
        "--reverse",
        "--raw",
        "--encoding=UTF-8",
        "--no-renames",
        "--no-show-signature",
    ];

    /// Human-readable form of the generating command
    pub fn log_command() -> String {
        format!("git {}", Self::LOG_ARGS.join(" "))
    }
}

impl LogFormat for GitLogFormat {
    fn name(&self) -> &'static str {
        "git"
    }

    fn first_char(&self) -> Option<u8> {
        Some(b'u')
    }

    fn parse_commit(&self, lines: &mut LineReader, filters: &Filters) -> Option<Commit> {
        let mut commit: Option<Commit> = None;

        while let Some(line) = lines.next_line() {
            if line.is_empty() {
                if commit.is_some() {
                    break;
                }
                continue;
            }

            if let Some(user) = line.strip_prefix("user:") {
                let timestamp: i64 = lines.next_line()?.trim().parse().unwrap_or(0);
                if timestamp == 0 {
                    return None;
                }
                commit = Some(Commit::new(timestamp, user));
                continue;
            }

            // files must follow a user line
            let current = commit.as_mut()?;

            let Some(tab) = line.find('\t') else {
                continue;
            };
            if tab == 0 || tab == line.len() - 1 {
                continue;
            }

            let status = line[..tab].chars().next_back().unwrap_or('M');
            let action = FileAction::from_code(status).unwrap_or(FileAction::Modified);

            let file = &line[tab + 1..];
            let file = if file.len() >= 2 && file.starts_with('"') && file.ends_with('"') {
                if file.len() == 2 {
                    continue;
                }
                unquote_c_path(&file[1..file.len() - 1])
            } else {
                file.to_string()
            };

            current.add_file(&file, action, filters);
        }

        commit
    }
}

/// Undo git's C-style path quoting (`\"`, `\\`, `\t`, `\n`, octal bytes)
fn unquote_c_path(quoted: &str) -> String {
    let bytes = quoted.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let next = bytes[i + 1];
        match next {
            b'0'..=b'7' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take(3)
                    .take_while(|b| (b'0'..=b'7').contains(*b))
                    .count();
                let value = bytes[i + 1..i + 1 + digits]
                    .iter()
                    .fold(0u32, |acc, b| acc * 8 + (b - b'0') as u32);
                out.push(value as u8);
                i += 1 + digits;
            }
            _ => {
                out.push(match next {
                    b't' => b'\t',
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'v' => 0x0b,
                    other => other,
                });
                i += 2;
            }
        }
    }

    filter_utf8(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> LineReader {
        LineReader::seekable(Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_custom_groups_lines_by_user_and_time() {
        let mut lines = reader(
            "100|alice|A|src/a.rs\n100|alice|M|src/b.rs\n200|bob|D|src/a.rs\n",
        );
        let filters = Filters::none();

        let first = CustomFormat.parse_commit(&mut lines, &filters).unwrap();
        assert_eq!(first.timestamp, 100);
        assert_eq!(first.username, "alice");
        assert_eq!(first.files.len(), 2);
        assert_eq!(first.files[1].action, FileAction::Modified);

        let second = CustomFormat.parse_commit(&mut lines, &filters).unwrap();
        assert_eq!(second.timestamp, 200);
        assert_eq!(second.files[0].action, FileAction::Deleted);
        assert_eq!(second.files[0].path, "/src/a.rs");

        assert!(CustomFormat.parse_commit(&mut lines, &filters).is_none());
    }

    #[test]
    fn test_custom_colour_and_defaults() {
        let mut lines = reader("\u{feff}50||| readme|#FF0000\n");
        let commit = CustomFormat
            .parse_commit(&mut lines, &Filters::none())
            .unwrap();
        assert_eq!(commit.username, "");
        assert_eq!(commit.files[0].action, FileAction::Added);
        assert_eq!(commit.files[0].colour, Colour::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_custom_malformed_line_yields_nothing() {
        let mut lines = reader("not a log line\n10|a|A|x.rs\n");
        let filters = Filters::none();
        assert!(CustomFormat.parse_commit(&mut lines, &filters).is_none());
        assert_eq!(
            CustomFormat.parse_commit(&mut lines, &filters).map(|c| c.timestamp),
            Some(10)
        );
    }

    #[test]
    fn test_custom_bad_timestamp_is_malformed() {
        let mut lines = reader("soon|a|A|x.rs\n");
        assert!(CustomFormat.parse_commit(&mut lines, &Filters::none()).is_none());
    }

    #[test]
    fn test_git_log_parses_files() {
        let mut lines = reader(concat!(
            "user:Jane Doe\n",
            "1275543595\n",
            ":000000 100644 0000000 5c2f1a1 A\tsrc/main.rs\n",
            ":100644 100644 1111111 2222222 M\tREADME\n",
            ":100644 000000 3333333 0000000 D\told.txt\n",
            "\n",
            "user:John\n",
            "1275543600\n",
            ":100644 100644 1111111 2222222 M\t\"caf\\303\\251.txt\"\n",
        ));
        let filters = Filters::none();

        let first = GitLogFormat.parse_commit(&mut lines, &filters).unwrap();
        assert_eq!(first.username, "Jane Doe");
        assert_eq!(first.timestamp, 1275543595);
        let actions: Vec<_> = first.files.iter().map(|f| f.action).collect();
        assert_eq!(
            actions,
            vec![FileAction::Added, FileAction::Modified, FileAction::Deleted]
        );

        let second = GitLogFormat.parse_commit(&mut lines, &filters).unwrap();
        assert_eq!(second.username, "John");
        assert_eq!(second.files[0].path, "/café.txt");

        assert!(GitLogFormat.parse_commit(&mut lines, &filters).is_none());
    }

    #[test]
    fn test_git_log_zero_timestamp_is_rejected() {
        let mut lines = reader("user:x\nnot-a-time\n:0 0 0 0 A\tf\n");
        assert!(GitLogFormat.parse_commit(&mut lines, &Filters::none()).is_none());
    }

    #[test]
    fn test_git_log_requires_user_first() {
        let mut lines = reader(":000000 100644 0 0 A\tsrc/main.rs\n");
        assert!(GitLogFormat.parse_commit(&mut lines, &Filters::none()).is_none());
    }

    #[test]
    fn test_git_first_char() {
        assert_eq!(GitLogFormat.first_char(), Some(b'u'));
        assert_eq!(CustomFormat.first_char(), None);
        assert!(GitLogFormat::log_command().starts_with("git log"));
    }

    #[test]
    fn test_unquote_c_path() {
        assert_eq!(unquote_c_path(r#"a\"b\\c"#), "a\"b\\c");
        assert_eq!(unquote_c_path(r"tab\there"), "tab\there");
        assert_eq!(unquote_c_path(r"\303\251"), "é");
        assert_eq!(unquote_c_path(r"\377"), "?");
    }
}
