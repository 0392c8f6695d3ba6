//! Quoted asset references in text files (materials, configs).

use regex::Regex;
use std::sync::LazyLock;

use super::DependencyList;

/// A quoted string ending in the extension of a file a material or config may point at.
static ASSET_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"([^"\r\n]+\.(?:paa|pac|tga|png|jpg|rvmat|p3d|bisurf))""#)
        .expect("asset reference pattern is valid")
});

/// Quoted strings that look like paths to assets, in first-seen order.
///
/// ```rust
/// use addonpack::formats::references::scan;
///
/// let rvmat = r#"class Stage1 { texture = "\x\a\data\body_nohq.paa"; uvSource = "tex"; };"#;
/// assert_eq!(scan(rvmat), vec!["\\x\\a\\data\\body_nohq.paa"]);
/// ```
pub fn scan(text: &str) -> Vec<String> {
    let mut found = DependencyList::new();
    for capture in ASSET_REFERENCE.captures_iter(text) {
        if let Some(path) = capture.get(1) {
            found.add(path.as_str());
        }
    }
    found.into_names()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_material() {
        let rvmat = r##"
            ambient[] = {1,1,1,1};
            PixelShaderID = "Super";
            class Stage1 { texture = "x\a\data\body_nohq.paa"; uvSource = "tex"; };
            class Stage2 { texture = "#(argb,8,8,3)color(0.5,0.5,0.5,1,DT)"; };
            class Stage3 { texture = "X\A\DATA\BODY_NOHQ.PAA"; };
            surfaceInfo = "x\a\data\metal.bisurf";
        "##;
        assert_eq!(
            scan(rvmat),
            vec!["x\\a\\data\\body_nohq.paa", "x\\a\\data\\metal.bisurf"]
        );
    }

    #[test]
    fn test_procedural_textures_are_not_references() {
        let rvmat = r##"texture = "#(argb,8,8,3)color(1,1,1,1)"; other = "#(ai,64,64,1)fresnel(1.3,7)";"##;
        assert!(scan(rvmat).is_empty());
    }

    #[test]
    fn test_scan_config_model_paths() {
        let config = r#"model = "\x\a\addons\main\box.p3d"; icon = "iconObject";"#;
        assert_eq!(scan(config), vec!["\\x\\a\\addons\\main\\box.p3d"]);
    }
}
