use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ============================================
    // INITIALIZATION ERRORS (1-5)
    // ============================================
    /// Contract already initialized
    AlreadyInitialized = 1,
    /// Contract not initialized
    NotInitialized = 2,

    // ============================================
    // MEMBERSHIP ERRORS (20-29)
    // ============================================
    /// Participant already has an account
    AlreadyRegistered = 20,
    /// Participant has no account
    NotRegistered = 21,
    /// Named sponsor has no account
    SponsorNotFound = 22,
    /// Participant cannot sponsor themselves
    InvalidSponsor = 23,
    /// Tier is zero, unknown, or not above the current tier
    InvalidTier = 24,
    /// Package tier too low to join the club
    ClubIneligible = 25,
    /// Participant already opted into the club
    AlreadyClubMember = 26,

    // ============================================
    // AMOUNT/BALANCE ERRORS (30-39)
    // ============================================
    /// Payment does not cover the package price
    InsufficientFunds = 30,
    /// Withdrawal exceeds the account balance
    InsufficientBalance = 31,
    /// Amount must be positive (or arithmetic overflowed)
    InvalidAmount = 32,
    /// Community pool, reserve and admin fees cannot cover a compound bonus
    CompoundBonusUnfunded = 33,

    // ============================================
    // GUARD ERRORS (40-49)
    // ============================================
    /// Second action from the same account within one ledger step
    ReplayRejected = 40,
    /// Rolling withdrawal volume would exceed the breaker threshold
    CircuitBreakerTripped = 41,

    // ============================================
    // POOL ERRORS (50-59)
    // ============================================
    /// Distribution interval has not elapsed
    DistributionTooEarly = 50,

    // ============================================
    // CONFIGURATION ERRORS (60-69)
    // ============================================
    /// Engine configuration failed validation
    InvalidConfig = 60,
    /// Package definition failed validation
    InvalidPackage = 61,
}
