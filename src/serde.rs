//! Serde support: a map round-trips through the equivalent mapping.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::HamtMap;

impl<K, V, S> Serialize for HamtMap<K, V, S>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Sr: Serializer>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct HamtMapVisitor<K, V, S> {
    marker: PhantomData<HamtMap<K, V, S>>,
}

impl<'de, K, V, S> Visitor<'de> for HamtMapVisitor<K, V, S>
where
    K: Deserialize<'de> + Hash + Eq + Clone,
    V: Deserialize<'de> + Clone,
    S: BuildHasher + Default + Clone,
{
    type Value = HamtMap<K, V, S>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut draft = HamtMap::<K, V, S>::default().mutate();
        while let Some((key, value)) = access.next_entry()? {
            if draft.set(key, value).is_err() {
                unreachable!("a fresh draft accepts edits");
            }
        }
        Ok(draft.finish())
    }
}

impl<'de, K, V, S> Deserialize<'de> for HamtMap<K, V, S>
where
    K: Deserialize<'de> + Hash + Eq + Clone,
    V: Deserialize<'de> + Clone,
    S: BuildHasher + Default + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HamtMapVisitor {
            marker: PhantomData,
        })
    }
}
