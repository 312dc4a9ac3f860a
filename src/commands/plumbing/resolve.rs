use crate::artifacts::vislog::session::LogSession;
use std::io::Write;

impl LogSession {
    /// Print `<hash> <root>` for every commit each prefix resolves to
    ///
    /// A prefix resolves to at most one commit per root; ambiguous or unknown
    /// prefixes print nothing. Returns how many commits were printed.
    pub fn resolve_prefixes(
        &self,
        prefixes: &[String],
        writer: &mut impl Write,
    ) -> anyhow::Result<usize> {
        let mut printed = 0;

        for prefix in prefixes {
            let resolved = self.resolve(prefix.trim());
            if resolved.is_empty() {
                tracing::debug!(prefix = %prefix, "prefix did not resolve");
            }

            for commit_id in resolved {
                writeln!(writer, "{} {}", commit_id.hash, commit_id.root)?;
                printed += 1;
            }
        }

        Ok(printed)
    }
}
