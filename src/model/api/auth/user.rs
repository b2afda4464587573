use crate::model::common::Rights;

/// The privilege level a request guard demands, e.g. `AuthToken<Admin>`.
pub trait Clearance {
    /// Does a token carrying the given rights clear this level?
    fn permits(rights: Rights) -> bool;
}

/// Admin-level access: managers and super admins.
pub struct Admin;

impl Clearance for Admin {
    fn permits(rights: Rights) -> bool {
        rights.is_admin()
    }
}

/// Voter-level access.
pub struct Voter;

impl Clearance for Voter {
    fn permits(rights: Rights) -> bool {
        rights == Rights::Voter
    }
}

/// Any authenticated account.
pub struct AnyUser;

impl Clearance for AnyUser {
    fn permits(_: Rights) -> bool {
        true
    }
}
