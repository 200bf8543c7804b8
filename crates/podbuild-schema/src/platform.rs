//! Platform-conditional attribute values.
//!
//! A podspec attribute is either the same on every Apple platform or differs
//! per platform (an `ios` block adding frameworks, an `osx` block adding
//! flags, ...). [`PlatformValue`] models both shapes and provides the merge
//! rules used when base values meet platform overrides and when subspecs fall
//! back to their root spec.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Osx,
    Watchos,
    Tvos,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Ios,
        Platform::Osx,
        Platform::Watchos,
        Platform::Tvos,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Osx => "osx",
            Platform::Watchos => "watchos",
            Platform::Tvos => "tvos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CombineError {
    #[error("cannot combine two non-empty values '{left}' and '{right}'")]
    NotCombinable { left: String, right: String },
}

/// A value that can live inside a [`PlatformValue`].
///
/// `combine` is the per-type merge rule. Types whose merge can never fail
/// also implement [`Monoid`].
pub trait Attr: Clone + Default + PartialEq {
    fn is_empty(&self) -> bool;
    fn combine(self, other: Self) -> Result<Self, CombineError>;
}

/// An [`Attr`] whose merge is total: lists append, sets union, maps merge.
pub trait Monoid: Attr {
    fn merge(self, other: Self) -> Self;
}

impl<T: Clone + PartialEq> Attr for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }

    fn combine(self, other: Self) -> Result<Self, CombineError> {
        Ok(self.merge(other))
    }
}

impl<T: Clone + PartialEq> Monoid for Vec<T> {
    fn merge(mut self, other: Self) -> Self {
        self.extend(other);
        self
    }
}

impl<T: Clone + Ord> Attr for BTreeSet<T> {
    fn is_empty(&self) -> bool {
        BTreeSet::is_empty(self)
    }

    fn combine(self, other: Self) -> Result<Self, CombineError> {
        Ok(self.merge(other))
    }
}

impl<T: Clone + Ord> Monoid for BTreeSet<T> {
    fn merge(mut self, other: Self) -> Self {
        self.extend(other);
        self
    }
}

/// Build-setting dictionaries. A key present on both sides keeps both
/// values, space separated, left first.
impl Attr for BTreeMap<String, String> {
    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }

    fn combine(self, other: Self) -> Result<Self, CombineError> {
        Ok(self.merge(other))
    }
}

impl Monoid for BTreeMap<String, String> {
    fn merge(mut self, other: Self) -> Self {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(existing) if !existing.is_empty() && !value.is_empty() => {
                    existing.push(' ');
                    existing.push_str(&value);
                }
                Some(existing) if existing.is_empty() => *existing = value,
                Some(_) => {}
                None => {
                    self.insert(key, value);
                }
            }
        }
        self
    }
}

impl Attr for String {
    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }

    fn combine(self, other: Self) -> Result<Self, CombineError> {
        if self.is_empty() {
            Ok(other)
        } else if other.is_empty() {
            Ok(self)
        } else {
            Err(CombineError::NotCombinable {
                left: self,
                right: other,
            })
        }
    }
}

/// One value per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerPlatform<T> {
    pub ios: T,
    pub osx: T,
    pub watchos: T,
    pub tvos: T,
}

impl<T> PerPlatform<T> {
    pub fn splat(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            ios: value.clone(),
            osx: value.clone(),
            watchos: value.clone(),
            tvos: value,
        }
    }

    pub fn get(&self, platform: Platform) -> &T {
        match platform {
            Platform::Ios => &self.ios,
            Platform::Osx => &self.osx,
            Platform::Watchos => &self.watchos,
            Platform::Tvos => &self.tvos,
        }
    }

    pub fn get_mut(&mut self, platform: Platform) -> &mut T {
        match platform {
            Platform::Ios => &mut self.ios,
            Platform::Osx => &mut self.osx,
            Platform::Watchos => &mut self.watchos,
            Platform::Tvos => &mut self.tvos,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Platform, &T)> {
        Platform::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerPlatform<U> {
        PerPlatform {
            ios: f(self.ios),
            osx: f(self.osx),
            watchos: f(self.watchos),
            tvos: f(self.tvos),
        }
    }

    pub fn zip_with<U, R>(
        self,
        other: PerPlatform<U>,
        mut f: impl FnMut(T, U) -> R,
    ) -> PerPlatform<R> {
        PerPlatform {
            ios: f(self.ios, other.ios),
            osx: f(self.osx, other.osx),
            watchos: f(self.watchos, other.watchos),
            tvos: f(self.tvos, other.tvos),
        }
    }

    pub fn try_zip_with<U, R, E>(
        self,
        other: PerPlatform<U>,
        mut f: impl FnMut(T, U) -> Result<R, E>,
    ) -> Result<PerPlatform<R>, E> {
        Ok(PerPlatform {
            ios: f(self.ios, other.ios)?,
            osx: f(self.osx, other.osx)?,
            watchos: f(self.watchos, other.watchos)?,
            tvos: f(self.tvos, other.tvos)?,
        })
    }
}

/// An attribute that is either uniform across platforms or varies per
/// platform. Exactly one representation is populated at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformValue<T> {
    Uniform(T),
    PerPlatform(PerPlatform<T>),
}

impl<T: Default> Default for PlatformValue<T> {
    fn default() -> Self {
        PlatformValue::Uniform(T::default())
    }
}

impl<T> PlatformValue<T> {
    pub fn is_per_platform(&self) -> bool {
        matches!(self, PlatformValue::PerPlatform(_))
    }

    /// The value seen when building for `platform`.
    pub fn for_platform(&self, platform: Platform) -> &T {
        match self {
            PlatformValue::Uniform(v) => v,
            PlatformValue::PerPlatform(pp) => pp.get(platform),
        }
    }

    /// Apply `f` to the uniform value or to every platform slot.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PlatformValue<U> {
        let mut f = f;
        match self {
            PlatformValue::Uniform(v) => PlatformValue::Uniform(f(v)),
            PlatformValue::PerPlatform(pp) => PlatformValue::PerPlatform(pp.map(f)),
        }
    }

    pub fn broadcast(self) -> PerPlatform<T>
    where
        T: Clone,
    {
        match self {
            PlatformValue::Uniform(v) => PerPlatform::splat(v),
            PlatformValue::PerPlatform(pp) => pp,
        }
    }
}

impl<T: Attr> PlatformValue<T> {
    pub fn empty() -> Self {
        PlatformValue::Uniform(T::default())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PlatformValue::Uniform(v) => v.is_empty(),
            PlatformValue::PerPlatform(pp) => pp.iter().all(|(_, v)| v.is_empty()),
        }
    }

    /// Structural merge. Two uniform values merge directly; otherwise the
    /// uniform side is broadcast into every slot and slots merge pairwise.
    /// `self` always comes first in the merged value.
    pub fn combine(self, other: Self) -> Result<Self, CombineError> {
        match (self, other) {
            (PlatformValue::Uniform(a), PlatformValue::Uniform(b)) => {
                Ok(PlatformValue::Uniform(a.combine(b)?))
            }
            (a, b) => Ok(PlatformValue::PerPlatform(
                a.broadcast().try_zip_with(b.broadcast(), Attr::combine)?,
            )),
        }
    }

    /// Per-platform selection: `self` where non-empty, otherwise `secondary`.
    /// A non-empty uniform `self` wins without looking at `secondary`.
    pub fn fallback(self, secondary: Self) -> Self {
        match (self, secondary) {
            (PlatformValue::Uniform(p), _) if !p.is_empty() => PlatformValue::Uniform(p),
            (PlatformValue::Uniform(_), PlatformValue::Uniform(s)) => PlatformValue::Uniform(s),
            (primary, secondary) => PlatformValue::PerPlatform(
                primary
                    .broadcast()
                    .zip_with(secondary.broadcast(), |p, s| if p.is_empty() { s } else { p }),
            ),
        }
    }

    /// Fold a per-platform value whose slots are all equal back to uniform.
    #[must_use]
    pub fn collapse(self) -> Self {
        match self {
            PlatformValue::PerPlatform(pp)
                if pp.ios == pp.osx && pp.ios == pp.watchos && pp.ios == pp.tvos =>
            {
                PlatformValue::Uniform(pp.ios)
            }
            other => other,
        }
    }
}

impl<T: Monoid> PlatformValue<T> {
    /// [`combine`](Self::combine) for types whose merge cannot fail.
    #[must_use]
    pub fn concat(self, other: Self) -> Self {
        match (self, other) {
            (PlatformValue::Uniform(a), PlatformValue::Uniform(b)) => {
                PlatformValue::Uniform(a.merge(b))
            }
            (a, b) => PlatformValue::PerPlatform(
                a.broadcast().zip_with(b.broadcast(), Monoid::merge),
            ),
        }
    }
}

impl<T: Clone> PlatformValue<Vec<T>> {
    /// Every element seen by any platform, first occurrence order.
    pub fn flatten_unique(&self) -> Vec<T>
    where
        T: PartialEq,
    {
        let mut out: Vec<T> = Vec::new();
        for platform in Platform::ALL {
            for item in self.for_platform(platform) {
                if !out.contains(item) {
                    out.push(item.clone());
                }
            }
        }
        out
    }
}
