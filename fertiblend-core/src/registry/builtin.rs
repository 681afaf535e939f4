//! Curated fertilizer compositions shipped with the engine.

pub(crate) struct BuiltinSalt {
    pub key: &'static str,
    pub name: &'static str,
    pub formula: &'static str,
    pub molecular_weight: f64,
    pub cations: &'static [(&'static str, f64)],
    pub anions: &'static [(&'static str, f64)],
    pub synonyms: &'static [&'static str],
    pub formula_variants: &'static [&'static str],
    pub ph_adjuster: bool,
}

macro_rules! salt {
    ($key:expr, $name:expr, $formula:expr, $mw:expr,
     cations: [$(($c:expr, $cv:expr)),* $(,)?],
     anions: [$(($a:expr, $av:expr)),* $(,)?],
     synonyms: [$($syn:expr),* $(,)?],
     formulas: [$($f:expr),* $(,)?]
     $(, ph_adjuster: $ph:expr)?) => {
        BuiltinSalt {
            key: $key,
            name: $name,
            formula: $formula,
            molecular_weight: $mw,
            cations: &[$(($c, $cv)),*],
            anions: &[$(($a, $av)),*],
            synonyms: &[$($syn),*],
            formula_variants: &[$($f),*],
            ph_adjuster: false $(|| $ph)?,
        }
    };
}

pub(crate) const BUILTIN_SALTS: &[BuiltinSalt] = &[
    // Acids
    salt!("nitric_acid", "Nitric Acid", "HNO3", 63.01,
        cations: [], anions: [("N", 22.23)],
        synonyms: ["nitric acid", "acido nitrico", "ácido nítrico"],
        formulas: ["HNO3"], ph_adjuster: true),
    salt!("phosphoric_acid", "Phosphoric Acid", "H3PO4", 97.99,
        cations: [], anions: [("P", 31.61)],
        synonyms: ["phosphoric acid", "acido fosforico", "ácido fosfórico"],
        formulas: ["H3PO4"], ph_adjuster: true),
    salt!("sulfuric_acid", "Sulfuric Acid", "H2SO4", 98.08,
        cations: [], anions: [("S", 32.69)],
        synonyms: ["sulfuric acid", "sulphuric acid", "acido sulfurico", "ácido sulfúrico"],
        formulas: ["H2SO4"], ph_adjuster: true),
    // Nitrates
    salt!("calcium_nitrate", "Calcium Nitrate", "Ca(NO3)2·4H2O", 236.15,
        cations: [("Ca", 16.97)], anions: [("N", 11.86)],
        synonyms: ["calcium nitrate", "nitrato de calcio", "nitrato calcico", "nitrato cálcico"],
        formulas: ["CA(NO3)2"]),
    salt!("potassium_nitrate", "Potassium Nitrate", "KNO3", 101.10,
        cations: [("K", 38.67)], anions: [("N", 13.85)],
        synonyms: ["potassium nitrate", "nitrato de potasio", "nitrato potasico", "nitrato potásico", "saltpeter"],
        formulas: ["KNO3"]),
    salt!("ammonium_nitrate", "Ammonium Nitrate", "NH4NO3", 80.04,
        cations: [("NH4", 22.5)], anions: [("N", 35.0)],
        synonyms: ["ammonium nitrate", "nitrato de amonio", "nitrato amonico", "nitrato amónico"],
        formulas: ["NH4NO3"]),
    salt!("magnesium_nitrate", "Magnesium Nitrate", "Mg(NO3)2·6H2O", 256.41,
        cations: [("Mg", 9.48)], anions: [("N", 10.93)],
        synonyms: ["magnesium nitrate", "nitrato de magnesio"],
        formulas: ["MG(NO3)2"]),
    // Sulfates
    salt!("ammonium_sulfate", "Ammonium Sulfate", "(NH4)2SO4", 132.14,
        cations: [("NH4", 27.28)], anions: [("N", 21.21), ("S", 24.26)],
        synonyms: ["ammonium sulfate", "ammonium sulphate", "sulfato de amonio", "sulfato amonico"],
        formulas: ["(NH4)2SO4"]),
    salt!("potassium_sulfate", "Potassium Sulfate", "K2SO4", 174.26,
        cations: [("K", 44.87)], anions: [("S", 18.39)],
        synonyms: ["potassium sulfate", "potassium sulphate", "sulfato de potasio", "sulfato potasico", "sop"],
        formulas: ["K2SO4"]),
    salt!("magnesium_sulfate", "Magnesium Sulfate", "MgSO4·7H2O", 246.47,
        cations: [("Mg", 9.87)], anions: [("S", 13.01)],
        synonyms: ["magnesium sulfate", "magnesium sulphate", "sulfato de magnesio", "epsom salt"],
        formulas: ["MGSO4"]),
    salt!("calcium_sulfate", "Calcium Sulfate", "CaSO4·2H2O", 172.17,
        cations: [("Ca", 23.28)], anions: [("S", 18.62)],
        synonyms: ["calcium sulfate", "calcium sulphate", "sulfato de calcio", "gypsum", "yeso"],
        formulas: ["CASO4"]),
    // Phosphates
    salt!("monopotassium_phosphate", "Monopotassium Phosphate", "KH2PO4", 136.09,
        cations: [("K", 28.73)], anions: [("P", 22.76)],
        synonyms: ["monopotassium phosphate", "potassium dihydrogen phosphate", "fosfato monopotasico", "fosfato monopotásico", "mkp"],
        formulas: ["KH2PO4"]),
    salt!("dipotassium_phosphate", "Dipotassium Phosphate", "K2HPO4", 174.18,
        cations: [("K", 44.89)], anions: [("P", 17.78)],
        synonyms: ["dipotassium phosphate", "fosfato dipotasico", "fosfato dipotásico", "dkp"],
        formulas: ["K2HPO4"]),
    salt!("monoammonium_phosphate", "Monoammonium Phosphate", "NH4H2PO4", 115.03,
        cations: [("NH4", 15.65)], anions: [("N", 12.18), ("P", 26.93)],
        synonyms: ["monoammonium phosphate", "fosfato monoamonico", "fosfato monoamónico", "map"],
        formulas: ["NH4H2PO4"]),
    salt!("diammonium_phosphate", "Diammonium Phosphate", "(NH4)2HPO4", 132.06,
        cations: [("NH4", 27.32)], anions: [("N", 21.21), ("P", 23.45)],
        synonyms: ["diammonium phosphate", "fosfato diamonico", "fosfato diamónico", "dap"],
        formulas: ["(NH4)2HPO4"]),
    // Chlorides
    salt!("calcium_chloride", "Calcium Chloride", "CaCl2·2H2O", 147.01,
        cations: [("Ca", 27.26)], anions: [("Cl", 48.23)],
        synonyms: ["calcium chloride", "cloruro de calcio"],
        formulas: ["CACL2"]),
    salt!("potassium_chloride", "Potassium Chloride", "KCl", 74.55,
        cations: [("K", 52.44)], anions: [("Cl", 47.56)],
        synonyms: ["potassium chloride", "cloruro de potasio", "muriate of potash"],
        formulas: ["KCL"]),
    salt!("magnesium_chloride", "Magnesium Chloride", "MgCl2·6H2O", 203.30,
        cations: [("Mg", 11.96)], anions: [("Cl", 34.87)],
        synonyms: ["magnesium chloride", "cloruro de magnesio"],
        formulas: ["MGCL2"]),
    // Iron
    salt!("iron_edta", "Iron EDTA", "C10H12FeN2NaO8", 367.05,
        cations: [("Fe", 13.0), ("Na", 6.27)], anions: [("N", 7.63)],
        synonyms: ["iron edta", "fe-edta", "fe edta", "iron chelate", "quelato de hierro", "hierro quelatado"],
        formulas: ["C10H12FEN2NAO8", "FEEDTA", "FE-EDTA"]),
    salt!("iron_dtpa", "Iron DTPA", "C14H18FeN3O10Na", 468.15,
        cations: [("Fe", 11.0), ("Na", 4.91)], anions: [("N", 8.97)],
        synonyms: ["iron dtpa", "fe-dtpa", "fe dtpa", "quelato de hierro dtpa"],
        formulas: ["C14H18FEN3O10NA", "FEDTPA", "FE-DTPA"]),
    salt!("iron_sulfate", "Iron Sulfate", "FeSO4·7H2O", 278.01,
        cations: [("Fe", 20.09)], anions: [("S", 11.53)],
        synonyms: ["iron sulfate", "iron sulphate", "ferrous sulfate", "sulfato ferroso", "sulfato de hierro"],
        formulas: ["FESO4"]),
    salt!("iron_chloride", "Iron Chloride", "FeCl3·6H2O", 270.30,
        cations: [("Fe", 20.66)], anions: [("Cl", 39.35)],
        synonyms: ["iron chloride", "ferric chloride", "cloruro ferrico", "cloruro férrico"],
        formulas: ["FECL3"]),
    // Manganese
    salt!("manganese_sulfate", "Manganese Sulfate", "MnSO4·4H2O", 223.06,
        cations: [("Mn", 24.63)], anions: [("S", 14.37)],
        synonyms: ["manganese sulfate", "manganese sulphate", "sulfato de manganeso"],
        formulas: ["MNSO4"]),
    salt!("manganese_chloride", "Manganese Chloride", "MnCl2·4H2O", 197.91,
        cations: [("Mn", 27.76)], anions: [("Cl", 35.83)],
        synonyms: ["manganese chloride", "cloruro de manganeso"],
        formulas: ["MNCL2"]),
    salt!("manganese_edta", "Manganese EDTA", "C10H12MnN2Na2O8", 389.13,
        cations: [("Mn", 14.12), ("Na", 11.82)], anions: [("N", 7.2)],
        synonyms: ["manganese edta", "mn-edta", "mn edta", "manganese chelate", "quelato de manganeso"],
        formulas: ["C10H12MNN2NA2O8", "MNEDTA", "MN-EDTA"]),
    // Zinc
    salt!("zinc_sulfate", "Zinc Sulfate", "ZnSO4·7H2O", 287.56,
        cations: [("Zn", 22.74)], anions: [("S", 11.15)],
        synonyms: ["zinc sulfate", "zinc sulphate", "sulfato de zinc"],
        formulas: ["ZNSO4"]),
    salt!("zinc_chloride", "Zinc Chloride", "ZnCl2", 136.29,
        cations: [("Zn", 47.97)], anions: [("Cl", 52.03)],
        synonyms: ["zinc chloride", "cloruro de zinc"],
        formulas: ["ZNCL2"]),
    salt!("zinc_edta", "Zinc EDTA", "C10H12N2Na2O8Zn", 399.60,
        cations: [("Zn", 16.36), ("Na", 11.51)], anions: [("N", 7.01)],
        synonyms: ["zinc edta", "zn-edta", "zn edta", "zinc chelate", "quelato de zinc"],
        formulas: ["C10H12N2NA2O8ZN", "ZNEDTA", "ZN-EDTA"]),
    // Copper
    salt!("copper_sulfate", "Copper Sulfate", "CuSO4·5H2O", 249.69,
        cations: [("Cu", 25.45)], anions: [("S", 12.84)],
        synonyms: ["copper sulfate", "copper sulphate", "sulfato de cobre", "blue vitriol"],
        formulas: ["CUSO4"]),
    salt!("copper_chloride", "Copper Chloride", "CuCl2·2H2O", 170.48,
        cations: [("Cu", 37.28)], anions: [("Cl", 41.59)],
        synonyms: ["copper chloride", "cloruro de cobre"],
        formulas: ["CUCL2"]),
    salt!("copper_edta", "Copper EDTA", "C10H12CuN2Na2O8", 397.74,
        cations: [("Cu", 15.98), ("Na", 11.56)], anions: [("N", 7.04)],
        synonyms: ["copper edta", "cu-edta", "cu edta", "copper chelate", "quelato de cobre"],
        formulas: ["C10H12CUN2NA2O8", "CUEDTA", "CU-EDTA"]),
    // Boron
    salt!("boric_acid", "Boric Acid", "H3BO3", 61.83,
        cations: [], anions: [("B", 17.48)],
        synonyms: ["boric acid", "acido borico", "ácido bórico"],
        formulas: ["H3BO3"]),
    salt!("borax", "Borax", "Na2B4O7·10H2O", 381.37,
        cations: [("Na", 12.06)], anions: [("B", 11.34)],
        synonyms: ["borax", "sodium borate", "borato de sodio", "tetraborato de sodio"],
        formulas: ["NA2B4O7"]),
    salt!("solubor", "Solubor", "Na2B8O13·4H2O", 412.52,
        cations: [("Na", 11.15)], anions: [("B", 20.97)],
        synonyms: ["solubor", "disodium octaborate", "octaborato de sodio"],
        formulas: ["NA2B8O13"]),
    // Molybdenum
    salt!("sodium_molybdate", "Sodium Molybdate", "Na2MoO4·2H2O", 241.95,
        cations: [("Na", 19.01)], anions: [("Mo", 39.66)],
        synonyms: ["sodium molybdate", "molibdato de sodio"],
        formulas: ["NA2MOO4"]),
    salt!("ammonium_molybdate", "Ammonium Molybdate", "(NH4)6Mo7O24·4H2O", 1235.86,
        cations: [("NH4", 8.76)], anions: [("Mo", 54.34)],
        synonyms: ["ammonium molybdate", "molibdato de amonio"],
        formulas: ["(NH4)6MO7O24"]),
    salt!("calcium_molybdate", "Calcium Molybdate", "CaMoO4", 200.02,
        cations: [("Ca", 20.04)], anions: [("Mo", 47.97)],
        synonyms: ["calcium molybdate", "molibdato de calcio"],
        formulas: ["CAMOO4"]),
    // Blends
    salt!("calcium_nitrate_boron", "Calcium Nitrate with Boron", "Ca(NO3)2·4H2O+B", 236.15,
        cations: [("Ca", 16.5)], anions: [("N", 11.5), ("B", 0.3)],
        synonyms: ["calcium nitrate boron", "calcium nitrate with boron", "nitrato de calcio con boro", "nitrato de calcio boronado"],
        formulas: []),
    salt!("magnesium_sulfate_micro", "Magnesium Sulfate with Micronutrients", "MgSO4·7H2O+micro", 246.47,
        cations: [("Mg", 9.5), ("Fe", 0.5), ("Mn", 0.3), ("Zn", 0.1)], anions: [("S", 12.5)],
        synonyms: ["magnesium sulfate micro", "magnesium sulfate with micronutrients", "sulfato de magnesio con micronutrientes"],
        formulas: []),
    salt!("micro_mix", "Micronutrient Mix", "Fe-Mn-Zn-Cu-B-Mo", 0.0,
        cations: [("Fe", 7.0), ("Mn", 3.5), ("Zn", 0.7), ("Cu", 0.28)], anions: [("B", 0.65), ("Mo", 0.3)],
        synonyms: ["micronutrient mix", "micro mix", "mezcla de micronutrientes", "micronutrientes"],
        formulas: []),
    salt!("tenso_cocktail", "Tenso Cocktail", "Fe-Mn-Zn-Cu-B-Mo (DTPA/EDTA)", 0.0,
        cations: [("Fe", 7.8), ("Mn", 3.7), ("Zn", 0.6), ("Cu", 0.25), ("Na", 3.0)], anions: [("B", 0.5), ("Mo", 0.25), ("N", 3.5)],
        synonyms: ["tenso cocktail", "tenso coctel", "tenso cóctel"],
        formulas: []),
    salt!("mixed_chelates", "Mixed Chelates", "EDTA chelate blend", 0.0,
        cations: [("Fe", 4.0), ("Mn", 2.0), ("Zn", 1.0), ("Cu", 0.5), ("Na", 5.0)], anions: [("N", 3.0), ("B", 0.5), ("Mo", 0.1)],
        synonyms: ["mixed chelates", "chelate blend", "quelatos mixtos"],
        formulas: []),
];

/// Keyword → registry key, tried in order when neither names nor formulas match.
/// Keywords of two characters or fewer only match whole words.
pub(crate) const KEYWORD_DEFAULTS: &[(&str, &str)] = &[
    ("dtpa", "iron_dtpa"),
    ("solubor", "solubor"),
    ("borax", "borax"),
    ("epsom", "magnesium_sulfate"),
    ("tenso", "tenso_cocktail"),
    ("ferrous", "iron_sulfate"),
    ("ferric", "iron_chloride"),
    ("boric", "boric_acid"),
    ("molybdate", "sodium_molybdate"),
    ("iron", "iron_edta"),
    ("hierro", "iron_edta"),
    ("fe", "iron_edta"),
    ("manganese", "manganese_sulfate"),
    ("manganeso", "manganese_sulfate"),
    ("mn", "manganese_sulfate"),
    ("zinc", "zinc_sulfate"),
    ("zn", "zinc_sulfate"),
    ("copper", "copper_sulfate"),
    ("cobre", "copper_sulfate"),
    ("cu", "copper_sulfate"),
    ("boron", "boric_acid"),
    ("boro", "boric_acid"),
    ("b", "boric_acid"),
    ("molybdenum", "sodium_molybdate"),
    ("molibdeno", "sodium_molybdate"),
    ("mo", "sodium_molybdate"),
    ("calcium", "calcium_nitrate"),
    ("calcio", "calcium_nitrate"),
    ("potassium", "potassium_nitrate"),
    ("potasio", "potassium_nitrate"),
    ("magnesium", "magnesium_sulfate"),
    ("magnesio", "magnesium_sulfate"),
    ("nitrate", "calcium_nitrate"),
    ("nitrato", "calcium_nitrate"),
    ("phosphate", "monopotassium_phosphate"),
    ("fosfato", "monopotassium_phosphate"),
    ("sulfate", "magnesium_sulfate"),
    ("sulfato", "magnesium_sulfate"),
    ("chelate", "iron_edta"),
    ("quelato", "iron_edta"),
    ("edta", "iron_edta"),
    ("micro", "micro_mix"),
    ("mix", "micro_mix"),
    ("cocktail", "micro_mix"),
    ("blend", "micro_mix"),
];

/// Salt added when a micronutrient has no adequate source in the catalog.
pub(crate) const PRIMARY_MICRO_SOURCES: [(&str, &str); 6] = [
    ("Fe", "iron_sulfate"),
    ("Mn", "manganese_sulfate"),
    ("Zn", "zinc_sulfate"),
    ("Cu", "copper_sulfate"),
    ("B", "boric_acid"),
    ("Mo", "sodium_molybdate"),
];
