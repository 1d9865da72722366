//! SSH client config reconciliation for a single managed host block.
//!
//! The file is parsed into a list of sections (a preamble plus one
//! section per `Host` stanza), the managed alias is filtered out, and
//! everything else is re-emitted byte-identical. The fresh block goes
//! at the end. Layout of the emitted block is a compatibility contract:
//! other tooling greps for these exact lines.

/// Fully-populated replacement block for the managed alias.
#[derive(Debug, Clone)]
pub struct HostBlock {
    pub alias: String,
    pub user: String,
    /// Public address of the running instance.
    pub hostname: String,
    pub port: u16,
    pub identity_file: String,
}

impl HostBlock {
    /// Serialize in the fixed line order: User, HostName, LocalForward,
    /// IdentityFile, ServerAliveInterval, ExitOnForwardFailure.
    pub fn render(&self) -> String {
        format!(
            "Host {}\n  User {}\n  HostName {}\n  LocalForward {} localhost:{}\n  IdentityFile {}\n  ServerAliveInterval 5\n  ExitOnForwardFailure yes\n",
            self.alias, self.user, self.hostname, self.port, self.port, self.identity_file,
        )
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Debug)]
enum Section {
    /// Lines before the first `Host` directive, kept verbatim.
    Preamble(Vec<String>),
    /// A `Host` stanza: the directive line plus every line (blank
    /// included) up to the next directive or end of file.
    Block {
        aliases: Vec<String>,
        lines: Vec<String>,
    },
}

impl Section {
    fn matches(&self, alias: &str) -> bool {
        match self {
            Self::Preamble(_) => false,
            Self::Block { aliases, .. } => aliases.iter().any(|a| a == alias),
        }
    }

    fn lines(&self) -> &[String] {
        match self {
            Self::Preamble(lines) | Self::Block { lines, .. } => lines,
        }
    }
}

/// A `Host` line may list several patterns; all of them key the block.
fn host_aliases(line: &str) -> Option<Vec<String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("Host") {
        return None;
    }
    Some(tokens.map(str::to_string).collect())
}

fn parse(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section::Preamble(Vec::new());

    for line in text.lines() {
        if let Some(aliases) = host_aliases(line) {
            sections.push(current);
            current = Section::Block {
                aliases,
                lines: vec![line.to_string()],
            };
        } else {
            match &mut current {
                Section::Preamble(lines) | Section::Block { lines, .. } => {
                    lines.push(line.to_string());
                }
            }
        }
    }
    sections.push(current);
    sections
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Rewrite `text` so that `block` is the one and only stanza for its
/// alias.
///
/// Every other stanza is preserved byte-identical and in its original
/// order; any existing stanza for the alias is removed wholesale (its
/// trailing blank lines travel with it) and the replacement is appended
/// at the end. Reconciling twice with the same data yields the same
/// file, since the appended block parses back into exactly the stanza
/// that the next run removes.
pub fn reconcile(text: &str, block: &HostBlock) -> String {
    let mut out = String::new();

    for section in parse(text) {
        if section.matches(&block.alias) {
            continue;
        }
        for line in section.lines() {
            out.push_str(line);
            out.push('\n');
        }
    }

    out.push_str(&block.render());
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_block() -> HostBlock {
        HostBlock {
            alias: "dev".to_string(),
            user: "ubuntu".to_string(),
            hostname: "203.0.113.5".to_string(),
            port: 8080,
            identity_file: "/home/me/.ssh/dev.pem".to_string(),
        }
    }

    const PROD_STANZA: &str = "Host prod\n  User admin\n  HostName prod.example.com\n";

    #[test]
    fn render_layout_is_exact() {
        assert_eq!(
            dev_block().render(),
            "Host dev\n\
             \x20 User ubuntu\n\
             \x20 HostName 203.0.113.5\n\
             \x20 LocalForward 8080 localhost:8080\n\
             \x20 IdentityFile /home/me/.ssh/dev.pem\n\
             \x20 ServerAliveInterval 5\n\
             \x20 ExitOnForwardFailure yes\n"
        );
    }

    #[test]
    fn empty_config_gets_just_the_block() {
        let out = reconcile("", &dev_block());
        assert_eq!(out, dev_block().render());
    }

    #[test]
    fn unrelated_blocks_stay_byte_identical_in_place() {
        let existing = format!(
            "Host dev\n  User old\n  HostName 198.51.100.1\n\n{PROD_STANZA}"
        );
        let out = reconcile(&existing, &dev_block());

        // prod first (original relative order), then exactly one dev
        // block at the end
        let prod_at = out.find("Host prod").unwrap();
        let dev_at = out.find("Host dev").unwrap();
        assert!(prod_at < dev_at);
        assert!(out.contains(PROD_STANZA));
        assert_eq!(out.matches("Host dev").count(), 1);
        assert!(out.ends_with(&dev_block().render()));
        assert!(!out.contains("198.51.100.1"));
    }

    #[test]
    fn preamble_lines_are_preserved() {
        let existing = "# managed by hand\nServerAliveCountMax 3\n\nHost dev\n  User old\n";
        let out = reconcile(existing, &dev_block());
        assert!(out.starts_with("# managed by hand\nServerAliveCountMax 3\n\n"));
        assert_eq!(out.matches("Host dev").count(), 1);
        assert!(!out.contains("User old"));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let existing = format!("{PROD_STANZA}\nHost dev\n  User old\n");
        let once = reconcile(&existing, &dev_block());
        let twice = reconcile(&once, &dev_block());
        assert_eq!(once, twice);
    }

    #[test]
    fn multi_alias_host_line_matches_any_token() {
        let existing = "Host dev dev.old\n  User old\n";
        let out = reconcile(existing, &dev_block());
        assert!(!out.contains("dev.old"));
        assert_eq!(out, dev_block().render());
    }

    #[test]
    fn alias_is_matched_as_whole_token() {
        // "devbox" must not be swept up when reconciling "dev"
        let existing = "Host devbox\n  User other\n  HostName box.example.com\n";
        let out = reconcile(existing, &dev_block());
        assert!(out.starts_with(existing));
        assert!(out.ends_with(&dev_block().render()));
    }

    #[test]
    fn comment_and_option_lines_belong_to_their_block() {
        let existing = "Host dev\n  # temporary\n  User old\n\nHost prod\n  User admin\n";
        let out = reconcile(existing, &dev_block());
        assert!(!out.contains("# temporary"));
        assert!(out.contains("Host prod\n  User admin\n"));
    }
}
