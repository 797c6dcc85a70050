//! `If-Match` / `If-None-Match` evaluation.
//!
//! A single, stateless decision per request. `If-Match` wins when both
//! headers are present. Comma-separated tag lists are not supported: such a
//! header value is compared as one opaque tag and therefore never matches a
//! real entity tag.

use crate::descriptor::{Method, Status};
use crate::etag::EntityTag;

/// One precondition header value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagMatch {
    /// `*`: any existing representation.
    Any,
    /// A specific tag, compared verbatim (quotes included).
    Tag(EntityTag),
}

impl TagMatch {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "*" => Self::Any,
            tag => Self::Tag(EntityTag::from_raw(tag)),
        }
    }

    fn matches(&self, current: Option<&EntityTag>) -> bool {
        match (self, current) {
            (Self::Any, current) => current.is_some(),
            (Self::Tag(expected), Some(current)) => expected == current,
            (Self::Tag(_), None) => false,
        }
    }
}

/// The parsed conditional headers of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Precondition {
    pub if_match: Option<TagMatch>,
    pub if_none_match: Option<TagMatch>,
}

impl Precondition {
    pub fn from_headers(if_match: Option<&str>, if_none_match: Option<&str>) -> Self {
        Self {
            if_match: if_match.map(TagMatch::parse),
            if_none_match: if_none_match.map(TagMatch::parse),
        }
    }

    pub fn if_match(tag: TagMatch) -> Self {
        Self { if_match: Some(tag), if_none_match: None }
    }

    pub fn if_none_match(tag: TagMatch) -> Self {
        Self { if_match: None, if_none_match: Some(tag) }
    }

    pub fn is_empty(&self) -> bool {
        self.if_match.is_none() && self.if_none_match.is_none()
    }
}

/// Result of gating an operation on its preconditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    /// Answer with this status without performing the operation.
    ShortCircuit(Status),
}

/// Decide whether an operation may proceed given the current tag of its
/// target (`None` when the target does not exist).
pub fn evaluate(current: Option<&EntityTag>, precondition: &Precondition, method: Method) -> Decision {
    if let Some(if_match) = &precondition.if_match {
        return if if_match.matches(current) {
            Decision::Proceed
        } else {
            Decision::ShortCircuit(Status::PreconditionFailed)
        };
    }
    if let Some(if_none_match) = &precondition.if_none_match {
        if !if_none_match.matches(current) {
            return Decision::Proceed;
        }
        return if method.is_read_only() {
            Decision::ShortCircuit(Status::NotModified)
        } else {
            Decision::ShortCircuit(Status::PreconditionFailed)
        };
    }
    Decision::Proceed
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [Method; 4] = [Method::Get, Method::Head, Method::Put, Method::Delete];

    fn tag(s: &str) -> EntityTag {
        EntityTag::from_raw(s)
    }

    fn short(status: Status) -> Decision {
        Decision::ShortCircuit(status)
    }

    #[test]
    fn no_headers_always_proceed() {
        for m in ALL {
            assert_eq!(evaluate(None, &Precondition::default(), m), Decision::Proceed);
            assert_eq!(evaluate(Some(&tag("\"a\"")), &Precondition::default(), m), Decision::Proceed);
        }
    }

    #[test]
    fn if_match_any() {
        let pre = Precondition::if_match(TagMatch::Any);
        for m in ALL {
            assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, m), Decision::Proceed);
            assert_eq!(evaluate(None, &pre, m), short(Status::PreconditionFailed));
        }
    }

    #[test]
    fn if_match_specific() {
        let pre = Precondition::if_match(TagMatch::Tag(tag("\"a\"")));
        for m in ALL {
            assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, m), Decision::Proceed);
            assert_eq!(evaluate(Some(&tag("\"b\"")), &pre, m), short(Status::PreconditionFailed));
            assert_eq!(evaluate(None, &pre, m), short(Status::PreconditionFailed));
        }
    }

    #[test]
    fn if_none_match_any() {
        let pre = Precondition::if_none_match(TagMatch::Any);
        assert_eq!(evaluate(None, &pre, Method::Put), Decision::Proceed);
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Get), short(Status::NotModified));
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Head), short(Status::NotModified));
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Put), short(Status::PreconditionFailed));
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Delete), short(Status::PreconditionFailed));
    }

    #[test]
    fn if_none_match_specific() {
        let pre = Precondition::if_none_match(TagMatch::Tag(tag("\"a\"")));
        assert_eq!(evaluate(Some(&tag("\"b\"")), &pre, Method::Get), Decision::Proceed);
        assert_eq!(evaluate(None, &pre, Method::Get), Decision::Proceed);
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Get), short(Status::NotModified));
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Put), short(Status::PreconditionFailed));
    }

    #[test]
    fn if_match_takes_precedence() {
        let pre = Precondition {
            if_match: Some(TagMatch::Tag(tag("\"a\""))),
            if_none_match: Some(TagMatch::Any),
        };
        // If-None-Match: * alone would short-circuit here.
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Put), Decision::Proceed);
    }

    #[test]
    fn parse_header_values() {
        assert_eq!(TagMatch::parse("*"), TagMatch::Any);
        assert_eq!(TagMatch::parse(" * "), TagMatch::Any);
        assert_eq!(TagMatch::parse("\"x\""), TagMatch::Tag(tag("\"x\"")));
        let pre = Precondition::from_headers(None, Some("*"));
        assert!(pre.if_match.is_none());
        assert_eq!(pre.if_none_match, Some(TagMatch::Any));
        assert!(Precondition::from_headers(None, None).is_empty());
    }

    #[test]
    fn tag_lists_are_not_split() {
        let pre = Precondition::from_headers(Some("\"a\", \"b\""), None);
        assert_eq!(evaluate(Some(&tag("\"a\"")), &pre, Method::Put), short(Status::PreconditionFailed));
    }

    fn method() -> impl Strategy<Value = Method> {
        prop_oneof![
            Just(Method::Get),
            Just(Method::Head),
            Just(Method::Put),
            Just(Method::Delete),
        ]
    }

    fn tag_match() -> impl Strategy<Value = TagMatch> {
        prop_oneof![Just(TagMatch::Any), "[a-c]".prop_map(|s| TagMatch::Tag(tag(&s)))]
    }

    proptest! {
        #[test]
        fn if_match_ignores_if_none_match(
            current in proptest::option::of("[a-c]"),
            m in tag_match(),
            n in proptest::option::of(tag_match()),
            method in method(),
        ) {
            let current = current.map(|s| tag(&s));
            let with_both = Precondition { if_match: Some(m.clone()), if_none_match: n };
            let alone = Precondition::if_match(m);
            prop_assert_eq!(
                evaluate(current.as_ref(), &with_both, method),
                evaluate(current.as_ref(), &alone, method)
            );
        }

        #[test]
        fn not_modified_only_for_reads(
            current in proptest::option::of("[a-c]"),
            pre_m in proptest::option::of(tag_match()),
            pre_n in proptest::option::of(tag_match()),
            method in method(),
        ) {
            let current = current.map(|s| tag(&s));
            let pre = Precondition { if_match: pre_m, if_none_match: pre_n };
            if evaluate(current.as_ref(), &pre, method) == Decision::ShortCircuit(Status::NotModified) {
                prop_assert!(method.is_read_only());
            }
        }

        #[test]
        fn absent_target_never_satisfies_if_match(m in tag_match(), method in method()) {
            let pre = Precondition::if_match(m);
            prop_assert_eq!(evaluate(None, &pre, method), Decision::ShortCircuit(Status::PreconditionFailed));
        }
    }
}
