/// Length of generated invite codes
pub const INVITE_CODE_LENGTH: usize = 10;

/// Attempts at drawing a fresh invite code before giving up on collisions
pub const INVITE_CODE_ATTEMPTS: usize = 5;

/// Maximum family name length in characters
pub const MAX_FAMILY_NAME_CHARS: usize = 30;

/// Upload cycle bounds in days
pub const MIN_UPLOAD_CYCLE: i32 = 1;
pub const MAX_UPLOAD_CYCLE: i32 = 365;

/// Maximum number of users in a single invite or removal batch
pub const MAX_BATCH_USERS: usize = 50;

/// Header carrying the caller id resolved by the gateway
pub const CALLER_ID_HEADER: &str = "x-user-id";

/// Route under which the upload directory is served; `IMAGE_BASE_URL` points here by default
pub const IMAGE_ROUTE: &str = "/images";

/// Default maximum representative image size (5MB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5_242_880;

/// Display format for family creation dates
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// Response Messages
// =============================================================================

pub const MSG_SUCCESS: &str = "Request succeeded";
pub const MSG_JOINED: &str = "Joined the family";
pub const MSG_INVITED: &str = "Invitations sent";
pub const MSG_ACCEPTED: &str = "Invitation accepted";
pub const MSG_REJECTED: &str = "Invitation rejected";
pub const MSG_UPLOAD_CYCLE_UPDATED: &str = "Upload cycle updated";
pub const MSG_FAMILY_DELETED: &str = "Family deleted";
pub const MSG_WITHDRAWN: &str = "Left the family";
pub const MSG_MEMBERS_REMOVED: &str = "Members removed from the family";
pub const MSG_AUTHORITY_CHANGED: &str = "Family owner changed";

// =============================================================================
// Error Messages
// =============================================================================

pub const ERR_FAMILY_NOT_FOUND: &str = "Family not found";
pub const ERR_USER_NOT_FOUND: &str = "User not found";
pub const ERR_INVITATION_NOT_FOUND: &str = "Invitation not found";
pub const ERR_NOT_A_MEMBER: &str = "Not a member of this family";
pub const ERR_OWNER_ONLY: &str = "Only the family owner can do this";
pub const ERR_ALREADY_MEMBER: &str = "User is already a member of this family";
pub const ERR_ALREADY_INVITED: &str = "User has already been invited to this family";
pub const ERR_OWNER_CANNOT_LEAVE: &str = "The owner must transfer authority before leaving";
pub const ERR_CANNOT_REMOVE_OWNER: &str = "The family owner cannot be removed";
