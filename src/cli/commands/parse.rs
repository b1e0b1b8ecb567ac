//! Parse command - print one result file as JSON.

use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;

use crate::feed::{Grammar, ResultRecord, parser};

/// Parse `file` and render it the way it would appear in the published JSON.
pub fn render(file: &Path, grammar: Grammar) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(file).with_context(|| format!("cannot read {}", file.display()))?;
    let record = parser::parse(grammar, &bytes)
        .with_context(|| format!("{} is not a valid {grammar} result", file.display()))?;

    let mut keyed: IndexMap<&str, &ResultRecord> = IndexMap::new();
    keyed.insert(record.key(), &record);
    Ok(serde_json::to_string_pretty(&keyed)?)
}

pub fn run(file: &Path, grammar: Grammar) -> anyhow::Result<()> {
    println!("{}", render(file, grammar)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_referendum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ref_result_Fife.xml");
        std::fs::write(
            &path,
            r#"<R><VotingArea name="Fife"/><Proposition>
<Answer winning="no" text="Yes" shortText="Y" votes="114148" percentageShare="44.95"/>
<Answer winning="yes" text="No" shortText="N" votes="139788" percentageShare="55.05"/>
</Proposition></R>"#,
        )
        .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&render(&path, Grammar::Referendum).unwrap()).unwrap();
        assert_eq!(json["Fife"][0]["winning"], false);
        assert_eq!(json["Fife"][1]["percentage"], "55.05");
    }

    #[test]
    fn test_render_reports_grammar() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<R/>").unwrap();

        let err = render(&path, Grammar::Local).unwrap_err();
        assert!(err.to_string().contains("not a valid local result"));
    }
}
