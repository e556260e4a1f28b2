//! # Taxonomy Module
//!
//! AIモデルの自由記述ラベルを、固定のカテゴリ体系（タクソノミー）に対応付ける。
//!
//! ## 設計目的
//!
//! モデルの回答形式は安定しないため、ラベルは次の順で解決する：
//!
//! - **exact**: 主ラベルとの完全一致（またはカテゴリ名そのもの）
//! - **synonym**: 同義語との完全一致
//! - **fuzzy**: 類似度が閾値（既定 0.6）以上の最良候補
//! - **none**: どれにも該当しない → `"unknown"`
//!
//! ## モジュール構成
//!
//! - `builtin`: ビルトインのタクソノミー定義
//! - `store`: タクソノミーのランタイムストアと読み込み
//! - `resolver`: カテゴリ解決器
//!
//! ## 使用例
//!
//! ```rust
//! use objectscan_core::taxonomy::{CategoryResolver, MatchKind};
//!
//! let resolver = CategoryResolver::builtin();
//!
//! let result = resolver.resolve("zitmeubel");
//! assert_eq!(result.category, "Meubels");
//! assert_eq!(result.kind, MatchKind::Synonym);
//!
//! let result = resolver.resolve("stoeltje");
//! assert_eq!(result.kind, MatchKind::Fuzzy);
//!
//! assert_eq!(resolver.resolve("").kind, MatchKind::None);
//! ```

mod builtin;
mod resolver;
mod store;

// Re-exports
pub use builtin::{BuiltinEntry, TaxonomyEntry, BUILTIN_TAXONOMY};
pub use resolver::{
    similarity, CategoryResolver, MatchKind, Resolution, DEFAULT_FUZZY_THRESHOLD,
    UNKNOWN_CATEGORY,
};
pub use store::{normalize, Taxonomy, TaxonomyFile};
