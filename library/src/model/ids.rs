//! Typed identifiers and the registry that issues them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OperationError;
use crate::model::timeline::Timeline;

/// Kind tag carried by every identifier's textual form.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Track,
    Clip,
    Effect,
    Transition,
    Media,
}

impl IdKind {
    pub fn prefix(self) -> &'static str {
        match self {
            IdKind::Track => "track",
            IdKind::Clip => "clip",
            IdKind::Effect => "effect",
            IdKind::Transition => "transition",
            IdKind::Media => "media",
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

macro_rules! typed_id {
    ($name:ident, $kind:expr) => {
        #[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const KIND: IdKind = $kind;

            /// Fresh random identifier. Prefer [`IdRegistry`] inside a session.
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", Self::KIND.prefix(), self.0)
            }
        }

        impl FromStr for $name {
            type Err = OperationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                parse_uuid(Self::KIND, value).map(Self)
            }
        }
    };
}

typed_id!(TrackId, IdKind::Track);
typed_id!(ClipId, IdKind::Clip);
typed_id!(EffectId, IdKind::Effect);
typed_id!(TransitionId, IdKind::Transition);
typed_id!(MediaId, IdKind::Media);

fn parse_uuid(kind: IdKind, value: &str) -> Result<Uuid, OperationError> {
    let malformed = || OperationError::MalformedId {
        kind,
        value: value.to_string(),
    };
    let raw = match value.split_once(':') {
        Some((prefix, rest)) if prefix == kind.prefix() => rest,
        Some(_) => return Err(malformed()),
        None => value,
    };
    Uuid::parse_str(raw).map_err(|_| malformed())
}

/// Issues identifiers that are unique for the lifetime of a session.
///
/// Every UUID handed out (or observed in a loaded timeline) is remembered, so an
/// identifier is never reissued even after the entity it named was deleted and the
/// deletion was undone.
#[derive(Debug, Default)]
pub struct IdRegistry {
    issued: HashSet<Uuid>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-seeded with every identifier already present in `timeline`.
    pub fn seeded_from(timeline: &Timeline) -> Self {
        let mut registry = Self::new();
        registry.observe(timeline);
        registry
    }

    pub fn observe(&mut self, timeline: &Timeline) {
        for track in timeline.tracks() {
            self.issued.insert(*track.id.as_uuid());
            for clip in &track.clips {
                self.issued.insert(*clip.id.as_uuid());
                self.issued
                    .extend(clip.effects.iter().map(|effect| *effect.id.as_uuid()));
            }
            self.issued
                .extend(track.transitions.iter().map(|t| *t.id.as_uuid()));
        }
    }

    fn issue(&mut self) -> Uuid {
        loop {
            let candidate = Uuid::new_v4();
            if self.issued.insert(candidate) {
                return candidate;
            }
        }
    }

    pub fn track(&mut self) -> TrackId {
        TrackId::from_uuid(self.issue())
    }

    pub fn clip(&mut self) -> ClipId {
        ClipId::from_uuid(self.issue())
    }

    pub fn effect(&mut self) -> EffectId {
        EffectId::from_uuid(self.issue())
    }

    pub fn transition(&mut self) -> TransitionId {
        TransitionId::from_uuid(self.issue())
    }

    pub fn is_issued(&self, uuid: &Uuid) -> bool {
        self.issued.contains(uuid)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Parses a textual identifier and checks it names something this registry issued.
    pub fn validate<T>(&self, value: &str) -> Result<T, OperationError>
    where
        T: FromStr<Err = OperationError> + Copy + Into<Uuid>,
    {
        let id: T = value.parse()?;
        if self.is_issued(&id.into()) {
            Ok(id)
        } else {
            Err(OperationError::UnknownId(value.to_string()))
        }
    }
}

macro_rules! into_uuid {
    ($($name:ident),*) => {
        $(impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        })*
    };
}

into_uuid!(TrackId, ClipId, EffectId, TransitionId, MediaId);
