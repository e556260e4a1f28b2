//! Builtin Taxonomy
//!
//! コード内で定義されるビルトインのタクソノミー。
//! タクソノミーファイルが設定されていない場合に使用される。

use serde::{Deserialize, Serialize};

/// ビルトインのタクソノミー定義（読み込み順 = 解決時の優先順）
pub const BUILTIN_TAXONOMY: &[BuiltinEntry] = &[
    BuiltinEntry {
        category: "Meubels",
        label: "stoel",
        synonyms: &["zitmeubel", "kruk", "eetkamerstoel", "bureaustoel"],
    },
    BuiltinEntry {
        category: "Meubels",
        label: "tafel",
        synonyms: &["eettafel", "salontafel", "bijzettafel"],
    },
    BuiltinEntry {
        category: "Meubels",
        label: "kast",
        synonyms: &["boekenkast", "ladekast", "dressoir", "kledingkast"],
    },
    BuiltinEntry {
        category: "Keukengerei",
        label: "mok",
        synonyms: &["beker", "koffiemok", "theemok"],
    },
    BuiltinEntry {
        category: "Keukengerei",
        label: "pan",
        synonyms: &["koekenpan", "steelpan", "braadpan", "kookpan"],
    },
    BuiltinEntry {
        category: "Keukengerei",
        label: "bord",
        synonyms: &["ontbijtbord", "dinerbord", "schaal"],
    },
    BuiltinEntry {
        category: "Huishoudartikelen",
        label: "emmer",
        synonyms: &["teil", "wasmand"],
    },
    BuiltinEntry {
        category: "Huishoudartikelen",
        label: "lamp",
        synonyms: &["bureaulamp", "vloerlamp", "schemerlamp"],
    },
    BuiltinEntry {
        category: "Elektronica",
        label: "laptop",
        synonyms: &["notebook", "computer"],
    },
    BuiltinEntry {
        category: "Elektronica",
        label: "telefoon",
        synonyms: &["smartphone", "mobiel", "gsm"],
    },
    BuiltinEntry {
        category: "Textiel",
        label: "jas",
        synonyms: &["jack", "mantel", "regenjas"],
    },
    BuiltinEntry {
        category: "Textiel",
        label: "tas",
        synonyms: &["rugzak", "handtas", "boodschappentas"],
    },
    BuiltinEntry {
        category: "Speelgoed",
        label: "knuffel",
        synonyms: &["knuffelbeest", "pluchen beest"],
    },
    BuiltinEntry {
        category: "Speelgoed",
        label: "bal",
        synonyms: &["voetbal", "speelbal"],
    },
    BuiltinEntry {
        category: "Fietsen",
        label: "fiets",
        synonyms: &["rijwiel", "e-bike", "kinderfiets"],
    },
    BuiltinEntry {
        category: "Boeken & Media",
        label: "boek",
        synonyms: &["roman", "kookboek", "stripboek"],
    },
];

/// ビルトインエントリの静的定義
#[derive(Debug, Clone)]
pub struct BuiltinEntry {
    /// カテゴリ名（表示・ログ用の正式名）
    pub category: &'static str,
    /// 主ラベル
    pub label: &'static str,
    /// 同義語
    pub synonyms: &'static [&'static str],
}

/// ランタイムのタクソノミーエントリ
///
/// ビルトイン、TOML、またはCSVから構築される。
/// `label`と`synonyms`は正規化（trim + 小文字化）済み。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    /// カテゴリ名
    pub category: String,
    /// 主ラベル
    pub label: String,
    /// 同義語（大文字小文字を区別しない）
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl TaxonomyEntry {
    pub fn new(
        category: impl Into<String>,
        label: impl Into<String>,
        synonyms: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            category: category.into(),
            label: label.into(),
            synonyms: synonyms.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&BuiltinEntry> for TaxonomyEntry {
    fn from(builtin: &BuiltinEntry) -> Self {
        Self::new(builtin.category, builtin.label, builtin.synonyms.iter().copied())
    }
}
