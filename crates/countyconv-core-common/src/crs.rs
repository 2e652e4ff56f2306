//! Coordinate reference system descriptors.
//!
//! Shapefiles carry their CRS as a WKT string in the `.prj` member. ESRI
//! writers rarely include an `AUTHORITY` node, so besides reading the EPSG
//! authority this module recognises the common ESRI names by table lookup.

use std::fmt;

/// EPSG code of WGS 84 longitude/latitude.
pub const WGS84_EPSG: u16 = 4326;

/// A coordinate reference system as read from a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crs {
    /// EPSG code, when one could be determined
    pub epsg: Option<u16>,
    /// Human readable name (the WKT root name or `EPSG:n`)
    pub name: String,
    /// Raw definition the descriptor was built from (e.g. `.prj` contents)
    pub definition: Option<String>,
}

impl Crs {
    /// Descriptor for a known EPSG code.
    #[must_use]
    pub fn epsg(code: u16) -> Self {
        Self {
            epsg: Some(code),
            name: format!("EPSG:{code}"),
            definition: None,
        }
    }

    /// WGS 84 longitude/latitude (EPSG:4326).
    #[must_use]
    pub fn wgs84() -> Self {
        Self::epsg(WGS84_EPSG)
    }

    /// Builds a descriptor from `.prj` WKT.
    ///
    /// A root-level `AUTHORITY["EPSG", ...]` (or WKT2 `ID[...]`) takes
    /// precedence; otherwise the root name is matched against known ESRI
    /// names. Unrecognised definitions yield a descriptor without EPSG code.
    ///
    /// ```
    /// use countyconv_core_common::Crs;
    ///
    /// let crs = Crs::from_prj(r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#);
    /// assert_eq!(crs.epsg, Some(4269));
    /// assert_eq!(crs.name, "GCS_North_American_1983");
    /// ```
    #[must_use]
    pub fn from_prj(wkt: &str) -> Self {
        let definition = wkt.trim();
        let root = WktNode::parse(definition);

        let name = root
            .as_ref()
            .and_then(WktNode::name)
            .map_or_else(|| "unknown".to_string(), str::to_string);
        let epsg = root
            .as_ref()
            .and_then(WktNode::epsg_authority)
            .or_else(|| lookup_esri_name(&name));

        Self {
            epsg,
            name,
            definition: Some(definition.to_string()),
        }
    }

    /// Returns true if this descriptor refers to the given EPSG code.
    #[must_use]
    pub fn is_epsg(&self, code: u16) -> bool {
        self.epsg == Some(code)
    }

    /// Short identifier: `EPSG:n` when known, otherwise the name.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self.epsg {
            Some(code) => format!("EPSG:{code}"),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) if self.name != format!("EPSG:{code}") => {
                write!(f, "EPSG:{code} ({})", self.name)
            },
            _ => f.write_str(&self.identifier()),
        }
    }
}

/// Minimal WKT tree: `KEYWORD[arg, arg, ...]`.
#[derive(Debug, Clone, PartialEq)]
enum WktValue {
    Node(WktNode),
    Text(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq)]
struct WktNode {
    keyword: String,
    args: Vec<WktValue>,
}

impl WktNode {
    fn parse(input: &str) -> Option<Self> {
        let mut parser = WktParser {
            chars: input.chars().collect(),
            pos: 0,
        };
        parser.node()
    }

    fn name(&self) -> Option<&str> {
        match self.args.first() {
            Some(WktValue::Text(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    fn epsg_authority(&self) -> Option<u16> {
        self.args.iter().rev().find_map(|arg| match arg {
            WktValue::Node(node)
                if node.keyword.eq_ignore_ascii_case("AUTHORITY")
                    || node.keyword.eq_ignore_ascii_case("ID") =>
            {
                let authority = node.name()?;
                if !authority.eq_ignore_ascii_case("EPSG") {
                    return None;
                }
                match node.args.get(1)? {
                    WktValue::Text(code) | WktValue::Literal(code) => code.trim().parse().ok(),
                    WktValue::Node(_) => None,
                }
            },
            _ => None,
        })
    }
}

struct WktParser {
    chars: Vec<char>,
    pos: usize,
}

impl WktParser {
    fn skip_whitespace(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn node(&mut self) -> Option<WktNode> {
        self.skip_whitespace();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let keyword: String = self.chars[start..self.pos].iter().collect();
        if keyword.is_empty() {
            return None;
        }
        self.skip_whitespace();
        if !matches!(self.peek(), Some('[' | '(')) {
            return None;
        }
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek()? {
                ']' | ')' => {
                    self.pos += 1;
                    break;
                },
                ',' => self.pos += 1,
                '"' => args.push(WktValue::Text(self.quoted()?)),
                c if c.is_ascii_alphabetic() => {
                    let save = self.pos;
                    match self.node() {
                        Some(node) => args.push(WktValue::Node(node)),
                        None => {
                            self.pos = save;
                            args.push(WktValue::Literal(self.literal()));
                        },
                    }
                },
                _ => args.push(WktValue::Literal(self.literal())),
            }
        }

        Some(WktNode { keyword, args })
    }

    fn quoted(&mut self) -> Option<String> {
        self.pos += 1;
        let mut text = String::new();
        loop {
            let c = self.peek()?;
            self.pos += 1;
            if c == '"' {
                // WKT escapes a quote by doubling it
                if self.peek() == Some('"') {
                    self.pos += 1;
                    text.push('"');
                } else {
                    return Some(text);
                }
            } else {
                text.push(c);
            }
        }
    }

    fn literal(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !matches!(c, ',' | ']' | ')') && !c.is_whitespace())
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' | '/' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Maps common ESRI `.prj` names onto EPSG codes.
fn lookup_esri_name(name: &str) -> Option<u16> {
    let name = normalize_name(name);
    let fixed = match name.as_str() {
        "GCS_WGS_1984" | "WGS_1984" | "WGS_84" | "WGS84" => Some(4326),
        "GCS_NORTH_AMERICAN_1983" | "NAD83" | "NAD_1983" => Some(4269),
        "GCS_NORTH_AMERICAN_1927" | "NAD27" | "NAD_1927" => Some(4267),
        "GCS_ETRS_1989" | "ETRS89" | "ETRS_1989" => Some(4258),
        "GCS_GDA_1994" | "GDA94" => Some(4283),
        "WGS_1984_WEB_MERCATOR_AUXILIARY_SPHERE"
        | "WGS_1984_WEB_MERCATOR"
        | "WGS_84_PSEUDO_MERCATOR"
        | "POPULAR_VISUALISATION_CRS_MERCATOR" => Some(3857),
        "NAD_1983_CONTIGUOUS_USA_ALBERS" | "NAD83_CONUS_ALBERS" => Some(5070),
        _ => None,
    };
    fixed.or_else(|| lookup_utm(&name))
}

/// `NAD_1983_UTM_ZONE_15N`, `WGS_1984_UTM_ZONE_33S` and friends.
fn lookup_utm(name: &str) -> Option<u16> {
    let (datum, zone) = name.split_once("_UTM_ZONE_")?;
    let (number, hemisphere) = match (zone.strip_suffix('N'), zone.strip_suffix('S')) {
        (Some(number), _) => (number, "N"),
        (None, Some(number)) => (number, "S"),
        (None, None) => return None,
    };
    let number: u16 = number.parse().ok()?;
    if !(1..=60).contains(&number) {
        return None;
    }
    match (datum, hemisphere) {
        ("WGS_1984" | "WGS_84" | "WGS84", "N") => Some(32600 + number),
        ("WGS_1984" | "WGS_84" | "WGS84", "S") => Some(32700 + number),
        ("NAD_1983" | "NAD83", "N") if number <= 23 => Some(26900 + number),
        ("NAD_1927" | "NAD27", "N") if (3..=22).contains(&number) => Some(26700 + number),
        ("ETRS_1989" | "ETRS89", "N") if (28..=38).contains(&number) => Some(25800 + number),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIGER_PRJ: &str = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]]"#;

    const WEB_MERCATOR_PRJ: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#;

    const OGC_WGS84_PRJ: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

    #[test]
    fn test_tiger_prj_resolves_to_nad83() {
        let crs = Crs::from_prj(TIGER_PRJ);
        assert_eq!(crs.epsg, Some(4269));
        assert_eq!(crs.name, "GCS_North_American_1983");
        assert_eq!(crs.definition.as_deref(), Some(TIGER_PRJ));
    }

    #[test]
    fn test_web_mercator_prj() {
        let crs = Crs::from_prj(WEB_MERCATOR_PRJ);
        assert_eq!(crs.epsg, Some(3857));
        assert_eq!(crs.identifier(), "EPSG:3857");
    }

    #[test]
    fn test_root_authority_wins_over_nested_ones() {
        let crs = Crs::from_prj(OGC_WGS84_PRJ);
        assert_eq!(crs.epsg, Some(4326));
        assert_eq!(crs.name, "WGS 84");
        assert_eq!(crs.to_string(), "EPSG:4326 (WGS 84)");
    }

    #[test]
    fn test_wkt2_id_node() {
        let crs = Crs::from_prj(
            r#"GEOGCRS["ETRS89",DATUM["European Terrestrial Reference System 1989",ELLIPSOID["GRS 1980",6378137,298.257222101]],ID["EPSG",4258]]"#,
        );
        assert_eq!(crs.epsg, Some(4258));
    }

    #[test]
    fn test_utm_names() {
        assert_eq!(lookup_esri_name("NAD_1983_UTM_Zone_15N"), Some(26915));
        assert_eq!(lookup_esri_name("WGS_1984_UTM_Zone_33N"), Some(32633));
        assert_eq!(lookup_esri_name("WGS 84 / UTM zone 33S"), Some(32733));
        assert_eq!(lookup_esri_name("WGS_1984_UTM_Zone_56S"), Some(32756));
        assert_eq!(lookup_esri_name("WGS_1984_UTM_Zone_61N"), None);
        assert_eq!(lookup_esri_name("WGS_1984_UTM_Zone_"), None);
    }

    #[test]
    fn test_utm_name_with_non_ascii_suffix() {
        let crs = Crs::from_prj(r#"PROJCS["WGS_1984_UTM_Zone_3é",GEOGCS["GCS_WGS_1984"]]"#);
        assert_eq!(crs.epsg, None);
        assert_eq!(crs.name, "WGS_1984_UTM_Zone_3é");
        assert_eq!(lookup_esri_name("NAD_1983_UTM_Zone_15Ñ"), None);
    }

    #[test]
    fn test_unknown_prj_has_no_code() {
        let crs = Crs::from_prj(r#"PROJCS["Some_Local_Grid",GEOGCS["GCS_Unknown"]]"#);
        assert_eq!(crs.epsg, None);
        assert_eq!(crs.identifier(), "Some_Local_Grid");
    }

    #[test]
    fn test_garbage_prj() {
        let crs = Crs::from_prj("not a wkt string");
        assert_eq!(crs.epsg, None);
        assert_eq!(crs.name, "unknown");
    }

    #[test]
    fn test_epsg_constructor() {
        let crs = Crs::wgs84();
        assert!(crs.is_epsg(4326));
        assert_eq!(crs.to_string(), "EPSG:4326");
        assert!(crs.definition.is_none());
    }
}
