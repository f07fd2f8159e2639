//! Info tables: which layer names make up a costume or an expression.
//!
//! A character may ship an `a` table, a `b` table, or both. Each one is an
//! independent vocabulary, so a selection is always answered from a single
//! table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::{ParseError, Row, TableReader};

pub const DRESS_TAG: &str = "dress";
pub const FACE_TAG: &str = "face";
const DRESS_COLUMNS: usize = 5;
const FACE_COLUMNS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("no dress {dress:?} with pose {pose:?} in any info table")]
    DressNotFound { dress: String, pose: String },
    #[error("no face {face:?} in the {info_type} info table")]
    FaceNotFound { face: String, info_type: InfoType },
}

/// Which info table a selection came from. Also picks the layers table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoType {
    A,
    B,
}

impl InfoType {
    pub const ALL: [InfoType; 2] = [InfoType::A, InfoType::B];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl fmt::Display for InfoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown info type {0:?}, expected \"a\" or \"b\"")]
pub struct UnknownInfoType(pub String);

impl FromStr for InfoType {
    type Err = UnknownInfoType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            other => Err(UnknownInfoType(other.to_string())),
        }
    }
}

/// Dress and face lookups built from one info table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoIndex {
    dresses: BTreeMap<(String, String), Vec<String>>,
    faces: BTreeMap<String, Vec<String>>,
}

impl InfoIndex {
    /// Parse one info table.
    ///
    /// `dress` and `face` rows must have exactly 5 and 4 columns; anything
    /// else with those tags is a [`ParseError::MalformedRow`]. Rows with
    /// other tags are ignored.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut index = Self::default();
        for row in TableReader::trimmed(text) {
            match row.first() {
                DRESS_TAG => {
                    expect_columns(&row, DRESS_TAG, DRESS_COLUMNS)?;
                    index
                        .dresses
                        .entry((row.get(1).to_string(), row.get(3).to_string()))
                        .or_default()
                        .push(row.get(4).to_string());
                }
                FACE_TAG => {
                    expect_columns(&row, FACE_TAG, FACE_COLUMNS)?;
                    index
                        .faces
                        .entry(row.get(1).to_string())
                        .or_default()
                        .push(row.get(3).to_string());
                }
                _ => {}
            }
        }
        log::debug!(
            "parsed info table: {} dress keys, {} faces",
            index.dresses.len(),
            index.faces.len()
        );
        Ok(index)
    }

    pub fn dress(&self, dress: &str, pose: &str) -> Option<&[String]> {
        self.dresses
            .get(&(dress.to_string(), pose.to_string()))
            .map(Vec::as_slice)
    }

    pub fn face(&self, face: &str) -> Option<&[String]> {
        self.faces.get(face).map(Vec::as_slice)
    }

    /// `(dress, pose)` keys in sorted order.
    pub fn dress_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dresses.keys().map(|(d, p)| (d.as_str(), p.as_str()))
    }

    pub fn face_labels(&self) -> impl Iterator<Item = &str> {
        self.faces.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.dresses.is_empty() && self.faces.is_empty()
    }
}

fn expect_columns(row: &Row<'_>, kind: &'static str, expected: usize) -> Result<(), ParseError> {
    if row.len() != expected {
        return Err(ParseError::MalformedRow {
            line: row.line,
            kind,
            expected,
            found: row.len(),
        });
    }
    Ok(())
}

/// The `a` and `b` indices of one character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoTables {
    a: InfoIndex,
    b: InfoIndex,
}

impl InfoTables {
    pub fn parse(a_info: &str, b_info: Option<&str>) -> Result<Self, ParseError> {
        Ok(Self {
            a: InfoIndex::parse(a_info)?,
            b: b_info.map(InfoIndex::parse).transpose()?.unwrap_or_default(),
        })
    }

    pub fn new(a: InfoIndex, b: InfoIndex) -> Self {
        Self { a, b }
    }

    pub fn index(&self, info_type: InfoType) -> &InfoIndex {
        match info_type {
            InfoType::A => &self.a,
            InfoType::B => &self.b,
        }
    }

    /// Resolve a dress/face/pose triple into layer names.
    ///
    /// The dress is looked up in `a` first, then `b`. Whichever matches also
    /// answers the face lookup; the other table is never consulted for it.
    pub fn select(&self, dress: &str, face: &str, pose: &str) -> Result<Selection, SelectError> {
        let (info_type, dresses) = InfoType::ALL
            .into_iter()
            .find_map(|t| self.index(t).dress(dress, pose).map(|names| (t, names)))
            .ok_or_else(|| SelectError::DressNotFound {
                dress: dress.to_string(),
                pose: pose.to_string(),
            })?;

        let faces = self
            .index(info_type)
            .face(face)
            .ok_or_else(|| SelectError::FaceNotFound {
                face: face.to_string(),
                info_type,
            })?;

        Ok(Selection {
            dresses: dresses.to_vec(),
            faces: faces.to_vec(),
            info_type,
        })
    }
}

/// How dress names and face names are merged into one request list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interleave {
    /// Two dress names wrap the faces: `[dress0, faces.., dress1]`.
    /// One dress name comes first. Other counts fall back to dresses then
    /// faces with a warning.
    #[default]
    SplitDress,
    /// Always dresses then faces.
    DressFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub dresses: Vec<String>,
    pub faces: Vec<String>,
    pub info_type: InfoType,
}

impl Selection {
    /// Ordered layer names to request.
    pub fn names(&self, interleave: Interleave) -> Vec<String> {
        let mut names = Vec::with_capacity(self.dresses.len() + self.faces.len());
        match (interleave, self.dresses.as_slice()) {
            (Interleave::SplitDress, [first, second]) => {
                names.push(first.clone());
                names.extend(self.faces.iter().cloned());
                names.push(second.clone());
            }
            (Interleave::SplitDress, dresses) => {
                if dresses.len() != 1 {
                    log::warn!(
                        "unexpected number of dress layers ({}): {:?}, result may be wrong",
                        dresses.len(),
                        dresses
                    );
                }
                names.extend(dresses.iter().cloned());
                names.extend(self.faces.iter().cloned());
            }
            (Interleave::DressFirst, dresses) => {
                names.extend(dresses.iter().cloned());
                names.extend(self.faces.iter().cloned());
            }
        }
        names
    }

    /// Keep only the last `/` segment of each face name.
    ///
    /// Face entries name a layer inside the face group; flat packs list the
    /// layer by its bare name.
    pub fn trim_face_paths(&mut self) {
        for face in &mut self.faces {
            if let Some((_, last)) = face.rsplit_once('/') {
                *face = last.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A_INFO: &str = "\u{feff}#comment\n\
dress\t制服\t0\t1\tbody/制服\n\
dress\t制服\t0\t1\tbody/制服上\n\
dress\t私服\t0\t2\tbody/私服\n\
face\t1\t0\tface/通常\n\
face\t2\t0\tface/笑顔\n\
fgname\tx\n\
\n";

    const B_INFO: &str = "dress\t私服\t0\t3\tbody/私服b\n\
face\t1\t0\tface/通常b\n\
face\t9\t0\tface/怒りb\n";

    fn tables() -> InfoTables {
        InfoTables::parse(A_INFO, Some(B_INFO)).unwrap()
    }

    #[test]
    fn test_parse_index() {
        let index = InfoIndex::parse(A_INFO).unwrap();
        assert_eq!(
            index.dress("制服", "1").unwrap(),
            &["body/制服".to_string(), "body/制服上".to_string()]
        );
        assert_eq!(index.face("2").unwrap(), &["face/笑顔".to_string()]);
        assert!(index.dress("制服", "2").is_none());
        assert_eq!(index.face_labels().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn test_malformed_rows() {
        let err = InfoIndex::parse("dress\tx\t0\t1\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedRow {
                line: 1,
                kind: DRESS_TAG,
                expected: 5,
                found: 4
            }
        );
        let err = InfoIndex::parse("\nface\t1\t0\tn\textra\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRow { line: 2, kind: FACE_TAG, found: 5, .. }));
    }

    #[test]
    fn test_select_prefers_a() {
        let sel = tables().select("制服", "1", "1").unwrap();
        assert_eq!(sel.info_type, InfoType::A);
        assert_eq!(sel.faces, vec!["face/通常".to_string()]);
    }

    #[test]
    fn test_select_falls_back_to_b() {
        let sel = tables().select("私服", "1", "3").unwrap();
        assert_eq!(sel.info_type, InfoType::B);
        assert_eq!(sel.dresses, vec!["body/私服b".to_string()]);
        assert_eq!(sel.faces, vec!["face/通常b".to_string()]);
    }

    #[test]
    fn test_face_bound_to_matched_table() {
        // Face 9 exists only in b, but the dress matched in a.
        let err = tables().select("制服", "9", "1").unwrap_err();
        assert_eq!(
            err,
            SelectError::FaceNotFound {
                face: "9".to_string(),
                info_type: InfoType::A
            }
        );
        // Face 2 exists only in a, but the dress matched in b.
        let err = tables().select("私服", "2", "3").unwrap_err();
        assert!(matches!(err, SelectError::FaceNotFound { info_type: InfoType::B, .. }));
    }

    #[test]
    fn test_dress_not_found() {
        let err = tables().select("水着", "1", "1").unwrap_err();
        assert!(matches!(err, SelectError::DressNotFound { .. }));
    }

    #[test]
    fn test_missing_b_table() {
        let tables = InfoTables::parse(A_INFO, None).unwrap();
        assert!(tables.index(InfoType::B).is_empty());
        assert!(tables.select("私服", "1", "3").is_err());
    }

    #[test]
    fn test_interleave() {
        let sel = Selection {
            dresses: vec!["d0".into(), "d1".into()],
            faces: vec!["f0".into(), "f1".into()],
            info_type: InfoType::A,
        };
        assert_eq!(sel.names(Interleave::SplitDress), vec!["d0", "f0", "f1", "d1"]);
        assert_eq!(sel.names(Interleave::DressFirst), vec!["d0", "d1", "f0", "f1"]);

        let single = Selection {
            dresses: vec!["d0".into()],
            ..sel.clone()
        };
        assert_eq!(single.names(Interleave::SplitDress), vec!["d0", "f0", "f1"]);

        let triple = Selection {
            dresses: vec!["d0".into(), "d1".into(), "d2".into()],
            ..sel
        };
        assert_eq!(
            triple.names(Interleave::SplitDress),
            vec!["d0", "d1", "d2", "f0", "f1"]
        );
    }

    #[test]
    fn test_trim_face_paths_leaves_dresses() {
        let mut sel = Selection {
            dresses: vec!["body/制服".into()],
            faces: vec!["face/笑顔".into(), "a/b/c".into(), "bare".into()],
            info_type: InfoType::A,
        };
        sel.trim_face_paths();
        assert_eq!(sel.faces, vec!["笑顔", "c", "bare"]);
        assert_eq!(sel.dresses, vec!["body/制服"]);
    }

    #[test]
    fn test_info_type_parse() {
        assert_eq!("b".parse::<InfoType>().unwrap(), InfoType::B);
        assert!("c".parse::<InfoType>().is_err());
        assert_eq!(InfoType::A.to_string(), "a");
    }
}
