use crate::editor::handlers::{editable_track, ensure_unused, owning_track};
use crate::error::{EditError, ValidationError};
use crate::model::clip::Clip;
use crate::model::effect::Effect;
use crate::model::ids::ClipId;
use crate::model::timeline::Timeline;

pub struct EffectHandler;

impl EffectHandler {
    /// Inserts `effect` at `index` in the clip's stack (index 0 is applied first).
    pub fn stack_effect(
        timeline: &mut Timeline,
        clip_id: ClipId,
        index: usize,
        effect: Effect,
    ) -> Result<(), EditError> {
        effect.kind.validate()?;
        ensure_unused(timeline, effect.id.as_uuid())?;
        let clip = Self::clip_mut(timeline, clip_id)?;
        let len = clip.effects.len();
        if index > len {
            return Err(ValidationError::IndexOutOfRange { index, len }.into());
        }
        log::debug!("Stacking {} on clip {} at {}", effect.kind.type_tag(), clip_id, index);
        clip.effects.insert(index, effect);
        Ok(())
    }

    pub fn remove_effect(timeline: &mut Timeline, clip_id: ClipId, index: usize) -> Result<(), EditError> {
        let clip = Self::clip_mut(timeline, clip_id)?;
        let len = clip.effects.len();
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len }.into());
        }
        clip.effects.remove(index);
        Ok(())
    }

    pub fn reorder_effect(
        timeline: &mut Timeline,
        clip_id: ClipId,
        from: usize,
        to: usize,
    ) -> Result<(), EditError> {
        let clip = Self::clip_mut(timeline, clip_id)?;
        let len = clip.effects.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::IndexOutOfRange { index, len }.into());
            }
        }
        let effect = clip.effects.remove(from);
        clip.effects.insert(to, effect);
        Ok(())
    }

    fn clip_mut(timeline: &mut Timeline, clip_id: ClipId) -> Result<&mut Clip, ValidationError> {
        let track_id = owning_track(timeline, clip_id)?;
        editable_track(timeline, track_id)?
            .clip_mut(clip_id)
            .ok_or(ValidationError::ClipNotFound(clip_id))
    }
}
