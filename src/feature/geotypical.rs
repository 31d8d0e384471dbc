use std::path::{Path, PathBuf};

use super::dictionary::FeatureDictionary;

const CATEGORIES: &[(&str, &str)] = &[
    ("A", "A_Culture"),
    ("B", "B_Hydrography"),
    ("C", "C_Hypsography"),
    ("D", "D_Physiography"),
    ("E", "E_Vegetation"),
    ("F", "F_Demarcation"),
    ("G", "G_Aeronautical_Information"),
    ("I", "I_Cadastral"),
    ("S", "S_Special_Use"),
];

const SUBCATEGORIES: &[(&str, &str)] = &[
    ("C", "C_Woodland"),
    ("D", "D_Power_Gen"),
    ("E", "E_Fab_Industry"),
    ("K", "K_Recreational"),
    ("L", "L_Misc_Feature"),
    ("T", "T_Comm"),
];

const CULTURE_TYPES: &[(&str, &str)] = &[
    ("015", "015_Building"),
    ("020", "020_Built-Up_Area"),
    ("030", "030_Power_Line"),
    ("040", "040_Power_Pylon"),
    ("050", "050_Display_Sign"),
    ("080", "080_Comm_Tower"),
    ("110", "110_Light_Standard"),
    ("240", "240_Tower-NC"),
    ("241", "241_Tower_General"),
];

fn lookup(table: &[(&str, &str)], code: &str) -> Option<String> {
    table.iter().find(|(c, _)| *c == code).map(|(_, d)| d.to_string())
}

/// Built-in directory names for the common FACC codes. Unknown categories go
/// to `Z_General`; unknown subcategories and feature types keep the raw code.
pub fn builtin_directories(facc: &str) -> [String; 3] {
    let category = facc.get(0..1).unwrap_or_default();
    let sub = facc.get(1..2).unwrap_or_default();
    let feature = facc.get(2..5).unwrap_or_default();

    let c = lookup(CATEGORIES, category).unwrap_or_else(|| "Z_General".to_string());
    let s = lookup(SUBCATEGORIES, sub).unwrap_or_else(|| sub.to_string());
    let f = match c.as_str() {
        "A_Culture" if feature == "010" => {
            if s == "E_Fab_Industry" { "010_Assembly_Plant".to_string() } else { "010_Power_Plant".to_string() }
        }
        "A_Culture" => lookup(CULTURE_TYPES, feature).unwrap_or_else(|| feature.to_string()),
        "E_Vegetation" if feature == "030" => "030_Trees".to_string(),
        _ => feature.to_string(),
    };
    [c, s, f]
}

/// Path of a geotypical model under
/// `<root>/GTModel/500_GTModelGeometry/<F1>/<F2>/<Fcode>/D500_S001_T001_<key>`.
/// The on-disk dictionary wins over the built-in table.
pub fn geotypical_model_path(root: &Path, key: &str, dictionary: Option<&FeatureDictionary>) -> PathBuf {
    let facc = key.get(0..5).unwrap_or(key);
    let [c, s, f] = dictionary
        .and_then(|d| d.select(facc))
        .unwrap_or_else(|| builtin_directories(facc));
    root.join("GTModel")
        .join("500_GTModelGeometry")
        .join(c)
        .join(s)
        .join(f)
        .join(format!("D500_S001_T001_{key}"))
}
