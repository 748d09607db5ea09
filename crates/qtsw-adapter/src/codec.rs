//! Encodes/decodes robot-owned order tags.
//!
//! Every order the robot submits carries a tag built from this codec. On
//! every broker callback the executor decodes the tag; a tag that does not
//! begin with the robot prefix is ignored — the robot must never act on
//! foreign orders.

const PREFIX: &str = "QTSW2";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderLeg {
    Entry,
    Stop,
    Target,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTag {
    pub intent_id: String,
    pub leg: OrderLeg,
}

pub struct OrderIdCodec;

impl OrderIdCodec {
    pub fn encode_entry(intent_id: &str) -> String {
        format!("{PREFIX}:{intent_id}")
    }

    pub fn encode_stop(intent_id: &str) -> String {
        format!("{PREFIX}:{intent_id}:STOP")
    }

    pub fn encode_target(intent_id: &str) -> String {
        format!("{PREFIX}:{intent_id}:TARGET")
    }

    /// Fresh per-attempt OCO group id, e.g.
    /// `QTSW2:abcd1234ef56abcd_PROTECTIVE_A1_093112345`.
    pub fn encode_oco_group(intent_id: &str, attempt: u32, hhmmssfff: &str) -> String {
        format!("{PREFIX}:{intent_id}_PROTECTIVE_A{attempt}_{hhmmssfff}")
    }

    /// Decode a tag. Returns `None` for any tag not beginning with the
    /// robot prefix — those orders must never be acted upon.
    pub fn decode(tag: &str) -> Option<DecodedTag> {
        let rest = tag.strip_prefix(PREFIX)?.strip_prefix(':')?;
        let mut parts = rest.splitn(2, ':');
        let intent_id = parts.next()?.to_string();
        if intent_id.is_empty() {
            return None;
        }
        let leg = match parts.next() {
            None => OrderLeg::Entry,
            Some("STOP") => OrderLeg::Stop,
            Some("TARGET") => OrderLeg::Target,
            Some(_) => return None,
        };
        Some(DecodedTag { intent_id, leg })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_each_leg() {
        let id = "abcd1234ef56abcd";
        assert_eq!(
            OrderIdCodec::decode(&OrderIdCodec::encode_entry(id)),
            Some(DecodedTag { intent_id: id.to_string(), leg: OrderLeg::Entry })
        );
        assert_eq!(
            OrderIdCodec::decode(&OrderIdCodec::encode_stop(id)),
            Some(DecodedTag { intent_id: id.to_string(), leg: OrderLeg::Stop })
        );
        assert_eq!(
            OrderIdCodec::decode(&OrderIdCodec::encode_target(id)),
            Some(DecodedTag { intent_id: id.to_string(), leg: OrderLeg::Target })
        );
    }

    #[test]
    fn foreign_tags_are_ignored() {
        assert_eq!(OrderIdCodec::decode("SOMEOTHERBOT:abc123"), None);
        assert_eq!(OrderIdCodec::decode("abc123"), None);
    }

    #[test]
    fn oco_group_ids_differ_per_attempt() {
        let a1 = OrderIdCodec::encode_oco_group("abc123", 1, "093112345");
        let a2 = OrderIdCodec::encode_oco_group("abc123", 2, "093112789");
        assert_ne!(a1, a2);
    }
}
