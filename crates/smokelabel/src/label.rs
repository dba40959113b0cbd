// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Label payload entries submitted back to the server.

use crate::geometry::SourceBox;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

/// The verdict recorded for one proposed box.
///
/// On the wire this is `null`, `false` or a `*_bbox` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeBoxes {
    /// The proposed box was accepted without edits (`null`).
    Accepted,
    /// No box belongs in this view (`false`).
    NoBox,
    /// The box was edited; coordinates are in source-media pixels.
    Edited(SourceBox),
}

impl RelativeBoxes {
    pub fn edited(&self) -> Option<&SourceBox> {
        match self {
            RelativeBoxes::Edited(b) => Some(b),
            _ => None,
        }
    }
}

impl Serialize for RelativeBoxes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RelativeBoxes::Accepted => serializer.serialize_none(),
            RelativeBoxes::NoBox => serializer.serialize_bool(false),
            RelativeBoxes::Edited(b) => b.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RelativeBoxes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RelativeBoxesVisitor;

        impl<'de> Visitor<'de> for RelativeBoxesVisitor {
            type Value = RelativeBoxes;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("null, false or a bounding box object")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(RelativeBoxes::Accepted)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(RelativeBoxes::Accepted)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                if v {
                    Err(E::invalid_value(de::Unexpected::Bool(true), &self))
                } else {
                    Ok(RelativeBoxes::NoBox)
                }
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let b = SourceBox::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(RelativeBoxes::Edited(b))
            }
        }

        deserializer.deserialize_any(RelativeBoxesVisitor)
    }
}

/// One entry of the label submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub id: i64,
    pub relative_boxes: RelativeBoxes,
}
