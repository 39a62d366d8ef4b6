//! Font database shared by text measurement, the preview and the exporter.

use crate::config::FontConfig;
use resvg::usvg::{self, fontdb};
use std::sync::Arc;

/// Build the font database described by the `[fonts]` config section
pub fn load_fonts(config: &FontConfig) -> Arc<fontdb::Database> {
    let mut db = fontdb::Database::new();

    if config.load_system_fonts {
        db.load_system_fonts();
    }

    for dir in &config.font_dirs {
        if dir.is_dir() {
            db.load_fonts_dir(dir);
        } else {
            tracing::warn!("Font directory {:?} does not exist, skipping", dir);
        }
    }

    if let Some(family) = config.sans_serif_family.as_deref() {
        if !family.is_empty() {
            db.set_sans_serif_family(family);
        }
    }

    if db.is_empty() {
        tracing::warn!("No fonts loaded; grade text will not be drawn");
    } else {
        tracing::debug!("Loaded {} font faces", db.len());
        ensure_sans_serif(&mut db);
    }

    Arc::new(db)
}

/// Sans families tried, in order, when the generic family does not resolve
const SANS_FALLBACKS: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "FreeSans",
    "Helvetica",
    "Verdana",
];

/// Point the generic sans-serif family at an installed face. fontdb maps it
/// to "Arial" out of the box, which most Linux systems do not ship.
fn ensure_sans_serif(db: &mut fontdb::Database) {
    if resolves(db, fontdb::Family::SansSerif) {
        return;
    }

    let installed: Vec<String> = db
        .faces()
        .filter_map(|face| face.families.first().map(|(name, _)| name.clone()))
        .collect();
    let Some(family) = pick_sans_fallback(&installed) else {
        return;
    };

    tracing::warn!(
        "Generic sans-serif family is not installed, using {:?} (set fonts.sans_serif_family to choose)",
        family
    );
    db.set_sans_serif_family(family);
}

fn resolves(db: &fontdb::Database, family: fontdb::Family<'_>) -> bool {
    db.query(&fontdb::Query {
        families: &[family],
        ..Default::default()
    })
    .is_some()
}

/// First known sans family among `installed`, else the first installed one
fn pick_sans_fallback(installed: &[String]) -> Option<String> {
    SANS_FALLBACKS
        .iter()
        .find(|wanted| installed.iter().any(|name| name == *wanted))
        .map(|name| name.to_string())
        .or_else(|| installed.first().cloned())
}

/// Parser options sharing `fonts`. `high_quality` selects anti-aliased
/// geometric-precision shapes and text and high-quality image smoothing.
pub fn usvg_options(fonts: &Arc<fontdb::Database>, high_quality: bool) -> usvg::Options<'static> {
    let mut options = usvg::Options::default();
    options.fontdb = Arc::clone(fonts);
    if high_quality {
        options.shape_rendering = usvg::ShapeRendering::GeometricPrecision;
        options.text_rendering = usvg::TextRendering::GeometricPrecision;
        options.image_rendering = usvg::ImageRendering::OptimizeQuality;
    } else {
        options.shape_rendering = usvg::ShapeRendering::OptimizeSpeed;
        options.text_rendering = usvg::TextRendering::OptimizeSpeed;
        options.image_rendering = usvg::ImageRendering::OptimizeSpeed;
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_font_dir_is_skipped() {
        let config = FontConfig {
            load_system_fonts: false,
            font_dirs: vec![PathBuf::from("/definitely/not/a/font/dir")],
            sans_serif_family: None,
        };
        let db = load_fonts(&config);
        assert!(db.is_empty());
    }

    #[test]
    fn test_fallback_prefers_known_sans() {
        let installed = vec![
            "Noto Serif".to_string(),
            "Liberation Sans".to_string(),
            "DejaVu Sans".to_string(),
        ];
        assert_eq!(pick_sans_fallback(&installed).as_deref(), Some("DejaVu Sans"));
    }

    #[test]
    fn test_fallback_uses_first_installed_family() {
        let installed = vec!["Cantarell".to_string(), "Noto Serif".to_string()];
        assert_eq!(pick_sans_fallback(&installed).as_deref(), Some("Cantarell"));
        assert_eq!(pick_sans_fallback(&[]), None);
    }

    #[test]
    fn test_sans_serif_resolves_when_fonts_exist() {
        let db = load_fonts(&FontConfig {
            load_system_fonts: true,
            font_dirs: Vec::new(),
            sans_serif_family: None,
        });
        if db.is_empty() {
            return;
        }
        assert!(resolves(&db, fontdb::Family::SansSerif));
    }
}
