//! Where the generic "wrap any marked identifier" rule must stand back.
//!
//! The generic rule is right for plain references. It is suppressed in
//! positions that either cannot hold a wrapped expression or that have a
//! more specific handler, which would otherwise instrument twice:
//!
//! | slot                               | rule         |
//! |------------------------------------|--------------|
//! | plain reference                    | wrap         |
//! | callee of a call                   | rename only  |
//! | update / assignment target         | rename only  |
//! | array element or spread argument   | dedicated    |
//! | return argument                    | dedicated    |
//! | arrow expression body              | dedicated    |
//!
//! The return and arrow-body handlers only instrument call-forms; a marked
//! name in those slots is renamed.
//! | declarator initializer             | dedicated    |
//!
//! Object property keys, function and class names, class field keys and
//! destructuring bindings are name nodes rather than expression slots, so
//! they never reach the generic rule; their handlers live in
//! [`crate::transform`].

/// Expression slot the driver is about to visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Reference,
    Callee,
    AssignTarget,
    ArrayElement,
    ReturnArg,
    ArrowBody,
    DeclInit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Replace the marked expression with its instrumented form.
    Wrap,
    /// Consume the mark without instrumenting the name.
    RenameOnly,
    /// Leave the mark for the handler owning this slot.
    Dedicated,
}

pub fn resolve(site: Site) -> Rule {
    match site {
        Site::Reference => Rule::Wrap,
        Site::Callee | Site::AssignTarget => Rule::RenameOnly,
        Site::ArrayElement | Site::ReturnArg | Site::ArrowBody | Site::DeclInit => Rule::Dedicated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_plain_references_are_wrapped_generically() {
        assert_eq!(resolve(Site::Reference), Rule::Wrap);
        for site in [
            Site::Callee,
            Site::AssignTarget,
            Site::ArrayElement,
            Site::ReturnArg,
            Site::ArrowBody,
            Site::DeclInit,
        ] {
            assert_ne!(resolve(site), Rule::Wrap, "{site:?}");
        }
    }

    #[test]
    fn call_targets_are_renamed_not_instrumented() {
        assert_eq!(resolve(Site::Callee), Rule::RenameOnly);
        assert_eq!(resolve(Site::AssignTarget), Rule::RenameOnly);
    }

    #[test]
    fn slots_with_own_handlers_defer() {
        assert_eq!(resolve(Site::ReturnArg), Rule::Dedicated);
        assert_eq!(resolve(Site::ArrayElement), Rule::Dedicated);
        assert_eq!(resolve(Site::ArrowBody), Rule::Dedicated);
        assert_eq!(resolve(Site::DeclInit), Rule::Dedicated);
    }
}
