//! Taxonomy Store
//!
//! タクソノミーのランタイムストア。
//! ビルトインまたはファイル（TOML / CSV）から構築し、読み込み順を保持する。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::builtin::{TaxonomyEntry, BUILTIN_TAXONOMY};
use crate::error::{ObjectScanError, Result};

/// 入力文字列の正規化（trim + 小文字化）
pub fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}

/// タクソノミーのランタイムストア
///
/// ラベルと同義語はタクソノミー全体で一意。重複は先勝ちで、
/// 後続の重複は破棄して`warnings`に記録する。
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    entries: Vec<TaxonomyEntry>,
    labels: HashMap<String, usize>,
    synonyms: HashMap<String, usize>,
    categories: HashMap<String, usize>,
    warnings: Vec<String>,
}

impl Taxonomy {
    /// ビルトインのみで初期化
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_TAXONOMY.iter().map(TaxonomyEntry::from))
    }

    /// エントリ列から構築（一意性を強制）
    pub fn from_entries(entries: impl IntoIterator<Item = TaxonomyEntry>) -> Self {
        let mut taxonomy = Self::default();
        for entry in entries {
            taxonomy.insert(entry);
        }
        taxonomy
    }

    fn insert(&mut self, entry: TaxonomyEntry) {
        let category = entry.category.trim().to_string();
        let label = normalize(&entry.label);

        if category.is_empty() || label.is_empty() {
            self.warnings.push(format!(
                "Skipped entry with empty category or label: {:?} / {:?}",
                entry.category, entry.label
            ));
            return;
        }

        if let Some(owner) = self.owner_of(&label) {
            self.warnings.push(format!(
                "Skipped label '{}' ({}): already defined by '{}'",
                label, category, owner
            ));
            return;
        }

        let index = self.entries.len();
        self.labels.insert(label.clone(), index);

        let mut synonyms = Vec::with_capacity(entry.synonyms.len());
        for raw in &entry.synonyms {
            let syn = normalize(raw);
            if syn.is_empty() {
                continue;
            }
            if syn == label || synonyms.contains(&syn) {
                continue;
            }
            if let Some(owner) = self.owner_of(&syn) {
                self.warnings.push(format!(
                    "Skipped synonym '{}' of '{}': already defined by '{}'",
                    syn, label, owner
                ));
                continue;
            }
            self.synonyms.insert(syn.clone(), index);
            synonyms.push(syn);
        }

        self.categories
            .entry(normalize(&category))
            .or_insert(index);

        self.entries.push(TaxonomyEntry {
            category,
            label,
            synonyms,
        });
    }

    /// 指定した語を既に持っているエントリのラベル
    fn owner_of(&self, term: &str) -> Option<&str> {
        self.labels
            .get(term)
            .or_else(|| self.synonyms.get(term))
            .map(|&i| self.entries[i].label.as_str())
    }

    /// ファイルから読み込む（拡張子で形式を判定: `.csv` はCSV、それ以外はTOML）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ObjectScanError::TaxonomyNotFound {
                path: path.to_path_buf(),
            });
        }

        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        let entries = if is_csv {
            read_csv_entries(path)?
        } else {
            let content = fs::read_to_string(path)?;
            let file: TaxonomyFile =
                toml::from_str(&content).map_err(|e| ObjectScanError::TaxonomyParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            file.entries
        };

        let taxonomy = Self::from_entries(entries);
        if taxonomy.is_empty() {
            return Err(ObjectScanError::EmptyTaxonomy);
        }
        for warning in &taxonomy.warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        Ok(taxonomy)
    }

    /// 設定されたパスがあれば読み込み、なければビルトイン
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    /// 全エントリ（読み込み順）
    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    /// 主ラベルでエントリを取得
    pub fn by_label(&self, term: &str) -> Option<&TaxonomyEntry> {
        self.labels.get(term).map(|&i| &self.entries[i])
    }

    /// 同義語でエントリを取得
    pub fn by_synonym(&self, term: &str) -> Option<&TaxonomyEntry> {
        self.synonyms.get(term).map(|&i| &self.entries[i])
    }

    /// カテゴリ名（大文字小文字無視）で最初のエントリを取得
    pub fn by_category(&self, term: &str) -> Option<&TaxonomyEntry> {
        self.categories.get(term).map(|&i| &self.entries[i])
    }

    /// カテゴリ名一覧（初出順、重複なし）
    pub fn category_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !names.contains(&entry.category.as_str()) {
                names.push(&entry.category);
            }
        }
        names
    }

    /// 読み込み時の警告
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// TOML形式のタクソノミーファイル
///
/// ```toml
/// [[entry]]
/// category = "Meubels"
/// label = "stoel"
/// synonyms = ["zitmeubel", "kruk"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyFile {
    #[serde(default, rename = "entry")]
    pub entries: Vec<TaxonomyEntry>,
}

/// CSVの列名（英語・オランダ語の両方を受け付ける）
const CATEGORY_HEADERS: &[&str] = &["category", "categorie"];
const LABEL_HEADERS: &[&str] = &["label"];
const SYNONYM_HEADERS: &[&str] = &["synonyms", "synoniemen"];

/// CSV形式（`Label,Synoniemen,Categorie`）を読み込む。同義語はカンマ区切り。
fn read_csv_entries(path: &Path) -> Result<Vec<TaxonomyEntry>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();

    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.contains(&normalize(h).as_str()))
    };

    let missing = |name: &str| ObjectScanError::TaxonomyParse {
        path: path.to_path_buf(),
        message: format!("missing '{}' column", name),
    };

    let category_col = column(CATEGORY_HEADERS).ok_or_else(|| missing("category"))?;
    let label_col = column(LABEL_HEADERS).ok_or_else(|| missing("label"))?;
    let synonym_col = column(SYNONYM_HEADERS);

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let category = record.get(category_col).unwrap_or_default();
        let label = record.get(label_col).unwrap_or_default();
        let synonyms = synonym_col
            .and_then(|c| record.get(c))
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty());
        entries.push(TaxonomyEntry::new(category, label, synonyms));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_taxonomy_builtin() {
        let taxonomy = Taxonomy::builtin();
        assert!(taxonomy.by_label("stoel").is_some());
        assert_eq!(taxonomy.by_synonym("zitmeubel").unwrap().label, "stoel");
        assert!(taxonomy.by_label("nonexistent").is_none());
        assert!(taxonomy.warnings().is_empty());
    }

    #[test]
    fn test_taxonomy_normalizes_terms() {
        let taxonomy = Taxonomy::from_entries([TaxonomyEntry::new(
            " Meubels ",
            "  Stoel ",
            ["ZitMeubel", " "],
        )]);
        let entry = taxonomy.by_label("stoel").unwrap();
        assert_eq!(entry.category, "Meubels");
        assert_eq!(entry.synonyms, vec!["zitmeubel"]);
    }

    #[test]
    fn test_taxonomy_first_entry_wins() {
        let taxonomy = Taxonomy::from_entries([
            TaxonomyEntry::new("Meubels", "stoel", ["kruk"]),
            TaxonomyEntry::new("Tuin", "tuinstoel", ["kruk", "ligstoel"]),
            TaxonomyEntry::new("Overig", "stoel", Vec::<String>::new()),
        ]);

        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.by_synonym("kruk").unwrap().category, "Meubels");
        assert_eq!(taxonomy.by_synonym("ligstoel").unwrap().category, "Tuin");
        assert_eq!(taxonomy.by_label("stoel").unwrap().category, "Meubels");
        assert_eq!(taxonomy.warnings().len(), 2);
    }

    #[test]
    fn test_synonym_cannot_shadow_label() {
        let taxonomy = Taxonomy::from_entries([
            TaxonomyEntry::new("Meubels", "stoel", Vec::<String>::new()),
            TaxonomyEntry::new("Tuin", "bank", ["stoel"]),
        ]);
        assert!(taxonomy.by_synonym("stoel").is_none());
        assert_eq!(taxonomy.by_label("stoel").unwrap().category, "Meubels");
    }

    #[test]
    fn test_category_names_in_load_order() {
        let taxonomy = Taxonomy::builtin();
        let names = taxonomy.category_names();
        assert_eq!(names[0], "Meubels");
        assert_eq!(names[1], "Keukengerei");
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_load_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("taxonomy.toml");
        fs::write(
            &path,
            r#"
[[entry]]
category = "Meubels"
label = "Stoel"
synonyms = ["zitmeubel"]

[[entry]]
category = "Keukengerei"
label = "mok"
"#,
        )
        .unwrap();

        let taxonomy = Taxonomy::load(&path).unwrap();
        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.by_synonym("zitmeubel").unwrap().label, "stoel");
        assert!(taxonomy.by_label("mok").unwrap().synonyms.is_empty());
    }

    #[test]
    fn test_load_reports_each_conflict_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("taxonomy.csv");
        fs::write(&path, "Label,Synoniemen,Categorie\nstoel,,Meubels\nStoel,,Textiel\n").unwrap();

        let taxonomy = Taxonomy::load(&path).unwrap();
        assert_eq!(taxonomy.len(), 1);
        assert_eq!(taxonomy.warnings().len(), 1);
    }

    #[test]
    fn test_load_csv_with_dutch_headers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("categorie_mapping.csv");
        fs::write(
            &path,
            "Label,Synoniemen,Categorie\n\
             stoel,\"zitmeubel, kruk\",Meubels\n\
             emmer,,Huishoudartikelen\n",
        )
        .unwrap();

        let taxonomy = Taxonomy::load(&path).unwrap();
        assert_eq!(taxonomy.len(), 2);
        assert_eq!(taxonomy.by_synonym("kruk").unwrap().category, "Meubels");
        assert_eq!(
            taxonomy.by_label("emmer").unwrap().category,
            "Huishoudartikelen"
        );
    }

    #[test]
    fn test_load_csv_missing_column() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.csv");
        fs::write(&path, "Naam,Synoniemen\nstoel,kruk\n").unwrap();

        let err = Taxonomy::load(&path).unwrap_err();
        assert!(matches!(err, ObjectScanError::TaxonomyParse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Taxonomy::load(Path::new("/nonexistent/taxonomy.toml")).unwrap_err();
        assert!(matches!(err, ObjectScanError::TaxonomyNotFound { .. }));
    }

    #[test]
    fn test_load_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.toml");
        fs::write(&path, "").unwrap();

        let err = Taxonomy::load(&path).unwrap_err();
        assert!(matches!(err, ObjectScanError::EmptyTaxonomy));
    }
}
