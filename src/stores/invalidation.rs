/// Kinds of cached reads, ignoring their parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    AllSessions,
    CallerAttendance,
    SessionAttendance,
    CallerProfile,
    CallerRole,
    IsCallerAdmin,
    UserAttendance,
    UserProfile,
}

/// Writes the client can perform against the gateway
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mutation {
    CreateSession,
    CheckIn,
    SaveProfile,
    AssignRole,
}

impl Mutation {
    /// Reads that must be refetched after this mutation succeeds
    pub fn invalidates(self) -> &'static [QueryFamily] {
        match self {
            Mutation::CreateSession => &[QueryFamily::AllSessions],
            Mutation::CheckIn => &[QueryFamily::CallerAttendance, QueryFamily::SessionAttendance],
            Mutation::SaveProfile => &[QueryFamily::CallerProfile],
            Mutation::AssignRole => &[QueryFamily::CallerRole, QueryFamily::IsCallerAdmin],
        }
    }
}
