use std::fmt::Write as _;

use anyhow::{Result, bail};
use uuid::Uuid;

pub const PROFILE_PATH: &str = "/QOpenSys/etc/profile";
pub const TEMP_DIR: &str = "/tmp";
pub const SCRATCH_TABLE_PREFIX: &str = "AIR";
pub const MAX_SYSTEM_NAME_LEN: usize = 10;

const TAG_LEN: usize = 8;
const SCRATCH_TAG_CHARS: usize = MAX_SYSTEM_NAME_LEN - SCRATCH_TABLE_PREFIX.len();

/// Short random id that keeps temp files and the scratch table of one
/// script apart from concurrent requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTag(String);

impl SessionTag {
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..TAG_LEN].to_string())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let tag = raw.trim().to_ascii_lowercase();
        if tag.len() != TAG_LEN || !tag.chars().all(|ch| ch.is_ascii_hexdigit()) {
            bail!("session tag must be {TAG_LEN} hex characters: {raw:?}");
        }
        Ok(Self(tag))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `AIR` plus seven tag characters: exactly the 10-character system
    /// name limit.
    #[must_use]
    pub fn scratch_table(&self) -> String {
        format!(
            "{SCRATCH_TABLE_PREFIX}{}",
            self.0[..SCRATCH_TAG_CHARS].to_ascii_uppercase()
        )
    }

    fn heredoc_delimiter(&self) -> String {
        format!("AIQ_EOF_{}", self.0.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMode {
    /// Materialize into a scratch table, export it as CSV, print the file.
    SelectToCsv,
    /// Run the statement as-is and print `OK`.
    Direct,
}

#[derive(Debug, Clone, Copy)]
pub struct ScriptRequest<'a> {
    pub statement: &'a str,
    pub library: &'a str,
    pub mode: ScriptMode,
}

/// Lifecycle of the scratch table inside a SELECT script. Every stage
/// before `Dropped` owns a remote object that has to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScratchStage {
    Created,
    Populated,
    Exported,
    Dropped,
}

impl ScratchStage {
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Created => Self::Populated,
            Self::Populated => Self::Exported,
            Self::Exported | Self::Dropped => Self::Dropped,
        }
    }

    #[must_use]
    pub const fn needs_drop(self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteScript {
    pub text: String,
    pub tag: SessionTag,
    pub scratch_table: Option<String>,
}

#[derive(Debug, Clone)]
struct TempFiles {
    sql: String,
    csv: String,
    log: String,
}

impl TempFiles {
    fn select(tag: &SessionTag) -> Self {
        let tag = tag.as_str();
        Self {
            sql: format!("{TEMP_DIR}/ai_{tag}.sql"),
            csv: format!("{TEMP_DIR}/ai_{tag}.csv"),
            log: format!("{TEMP_DIR}/ai_{tag}.log"),
        }
    }

    fn direct(tag: &SessionTag) -> Self {
        let tag = tag.as_str();
        Self {
            sql: format!("{TEMP_DIR}/ai_dml_{tag}.sql"),
            csv: String::new(),
            log: format!("{TEMP_DIR}/ai_dml_{tag}.log"),
        }
    }

    fn remove_command(&self) -> String {
        let paths = [&self.sql, &self.csv, &self.log]
            .into_iter()
            .filter(|path| !path.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>();
        format!("rm -f {}", paths.join(" "))
    }
}

#[must_use]
pub fn build_script(request: &ScriptRequest<'_>, tag: &SessionTag) -> RemoteScript {
    match request.mode {
        ScriptMode::SelectToCsv => build_select_script(request, tag),
        ScriptMode::Direct => build_direct_script(request, tag),
    }
}

fn build_select_script(request: &ScriptRequest<'_>, tag: &SessionTag) -> RemoteScript {
    let files = TempFiles::select(tag);
    let scratch = format!("{}/{}", request.library, tag.scratch_table());
    let drop_scratch = format!("system \"DLTF FILE({scratch})\" 1>/dev/null 2>/dev/null");
    let delimiter = tag.heredoc_delimiter();

    let mut script = String::new();
    let _ = writeln!(script, ". {PROFILE_PATH}");
    let _ = writeln!(script, "{}", files.remove_command());
    let _ = writeln!(script, "{drop_scratch}");
    let _ = writeln!(script);

    let mut stage = ScratchStage::Created;
    let _ = writeln!(script, "cat <<'{delimiter}' > {}", files.sql);
    let _ = writeln!(script, "CREATE TABLE {scratch} AS (");
    let _ = writeln!(script, "{}", request.statement.trim());
    let _ = writeln!(script, ") WITH DATA");
    let _ = writeln!(script, "{delimiter}");
    let _ = writeln!(script);
    let _ = writeln!(script, "{} 1>/dev/null 2>{}", runsqlstm(&files.sql), files.log);
    push_failure_branch(&mut script, "RUNSQLSTM", &files, stage, &drop_scratch);

    stage = stage.next();
    let _ = writeln!(
        script,
        "system \"CPYTOIMPF FROMFILE({scratch}) TOSTMF('{}') MBROPT(*REPLACE) \
STMFCODPAG(*PCASCII) RCDDLM(*CRLF) DTAFMT(*DLM) FLDDLM(',')\" 1>/dev/null 2>{}",
        files.csv, files.log
    );
    push_failure_branch(&mut script, "CPYTOIMPF", &files, stage, &drop_scratch);

    stage = stage.next();
    let _ = writeln!(script, "cat {}", files.csv);
    let _ = writeln!(script);
    if stage.needs_drop() {
        let _ = writeln!(script, "{drop_scratch}");
    }
    let _ = writeln!(script, "{}", files.remove_command());

    RemoteScript {
        text: script,
        tag: tag.clone(),
        scratch_table: Some(scratch),
    }
}

fn build_direct_script(request: &ScriptRequest<'_>, tag: &SessionTag) -> RemoteScript {
    let files = TempFiles::direct(tag);
    let delimiter = tag.heredoc_delimiter();

    let mut script = String::new();
    let _ = writeln!(script, ". {PROFILE_PATH}");
    let _ = writeln!(script, "{}", files.remove_command());
    let _ = writeln!(script, "cat <<'{delimiter}' > {}", files.sql);
    let _ = writeln!(script, "{}", request.statement.trim());
    let _ = writeln!(script, "{delimiter}");
    let _ = writeln!(script, "{} 1>/dev/null 2>{}", runsqlstm(&files.sql), files.log);
    push_failure_branch(&mut script, "RUNSQLSTM", &files, ScratchStage::Dropped, "");
    let _ = writeln!(script, "{}", files.remove_command());
    let _ = writeln!(script, "echo \"OK\"");

    RemoteScript {
        text: script,
        tag: tag.clone(),
        scratch_table: None,
    }
}

fn runsqlstm(source: &str) -> String {
    format!("system \"RUNSQLSTM SRCSTMF('{source}') COMMIT(*NONE) NAMING(*SYS)\"")
}

fn push_failure_branch(
    script: &mut String,
    tool: &str,
    files: &TempFiles,
    stage: ScratchStage,
    drop_scratch: &str,
) {
    let _ = writeln!(script, "if [ $? -ne 0 ]; then");
    let _ = writeln!(script, "  echo \"ERROR: {tool} failed\"");
    let _ = writeln!(script, "  cat {}", files.log);
    if stage.needs_drop() {
        let _ = writeln!(script, "  {drop_scratch}");
    }
    let _ = writeln!(script, "  {}", files.remove_command());
    let _ = writeln!(script, "  exit 1");
    let _ = writeln!(script, "fi");
    let _ = writeln!(script);
}

#[cfg(test)]
mod tests {
    use super::{ScratchStage, SessionTag};

    #[test]
    fn stages_advance_to_dropped_and_stay_there() {
        let mut stage = ScratchStage::Created;
        let mut seen = vec![stage];
        while stage != ScratchStage::Dropped {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                ScratchStage::Created,
                ScratchStage::Populated,
                ScratchStage::Exported,
                ScratchStage::Dropped
            ]
        );
        assert_eq!(ScratchStage::Dropped.next(), ScratchStage::Dropped);
        assert!(!ScratchStage::Dropped.needs_drop());
    }

    #[test]
    fn generated_tags_are_eight_hex_chars() {
        let tag = SessionTag::generate();
        assert_eq!(tag.as_str().len(), 8);
        assert!(tag.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
        assert!(SessionTag::parse(tag.as_str()).is_ok());
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(SessionTag::parse("xyz").is_err());
        assert!(SessionTag::parse("0123456g").is_err());
    }
}
