use failure_derive::Fail;

/// Flat, tagged error taxonomy for the wallet core. Builders return
/// `(result, error)` pairs via `Result<T, Error>`; the synchronizer logs and
/// continues on everything except the fatal conditions at the bottom.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	// --- container ---
	#[fail(display = "wrong password")]
	WrongPassword,
	#[fail(display = "not a wallet file")]
	NotAWalletFile,
	#[fail(display = "wallet container is corrupted")]
	CorruptedContainer,
	#[fail(display = "unsupported wallet file format version: {}", 0)]
	UnsupportedWalletFileFormatVersion(u32),
	#[fail(display = "wallet file not found at '{}'", 0)]
	WalletFileMissing(String),
	#[fail(display = "wallet was written by an incompatible core version: {}", 0)]
	IncompatibleCoreVersion(String),

	// --- address / keys ---
	#[fail(display = "address has the wrong length")]
	InvalidAddressLength,
	#[fail(display = "address has an unexpected network prefix")]
	InvalidAddressPrefix,
	#[fail(display = "invalid base58 character '{}' at position {}", 0, 1)]
	InvalidBase58Character(char, usize),
	#[fail(display = "invalid base58 length")]
	InvalidBase58Length,
	#[fail(display = "invalid base58 checksum")]
	InvalidBase58Checksum,
	#[fail(display = "key is not valid hexadecimal")]
	NonHexKey,
	#[fail(display = "key does not lie on the curve")]
	NotOnCurve,
	#[fail(display = "keys are not deterministic: no mnemonic seed can represent them")]
	KeysNotDeterministic,

	// --- balance / amount ---
	#[fail(
		display = "not enough balance: available {}, needed {}",
		available, needed
	)]
	NotEnoughBalance { available: u64, needed: u64 },
	#[fail(display = "amount is zero")]
	AmountIsZero,
	#[fail(display = "amount would overflow")]
	WillOverflow,
	#[fail(display = "negative value is not allowed here")]
	NegativeValue,
	#[fail(display = "output amount {} is not a pretty amount", 0)]
	AmountsNotPretty(u64),
	#[fail(display = "fee {} is below the required minimum {}", given, minimum)]
	FeeTooSmall { given: u64, minimum: u64 },
	#[fail(display = "unexpected fee: expected {}, got {}", expected, actual)]
	UnexpectedFee { expected: u64, actual: u64 },

	// --- decoys ---
	#[fail(display = "could not fetch decoy outputs from node")]
	CantGetDecoys,
	#[fail(
		display = "not enough decoys available for mixin {}: got {}, consider lowering mixin",
		requested, available
	)]
	NotEnoughDecoys { requested: u64, available: u64 },

	// --- size ---
	#[fail(display = "too many inputs required for this transaction")]
	TooManyInputs,
	#[fail(display = "could not decompose amount {} into pretty denominations", 0)]
	OutputDecompositionFailed(u64),
	#[fail(display = "wallet is fully optimized, nothing left to fuse")]
	FullyOptimized,
	#[fail(display = "mixin is too large for a fusion transaction")]
	FusionMixinTooLarge,

	// --- mnemonic ---
	#[fail(display = "'{}' is not a valid mnemonic word", 0)]
	InvalidMnemonicWord(String),
	#[fail(display = "mnemonic seed has the wrong number of words: {}", 0)]
	InvalidMnemonicLength(usize),
	#[fail(display = "mnemonic seed has an invalid checksum word")]
	InvalidMnemonicChecksum,

	// --- node ---
	#[fail(display = "daemon is offline or unreachable")]
	DaemonOffline,
	#[fail(display = "daemon rejected the request: {}", 0)]
	DaemonError(String),
	#[fail(display = "daemon is still processing the previous request")]
	DaemonStillProcessing,
	#[fail(display = "daemon returned data inconsistent with an honest node: {}", 0)]
	FaultyNode(String),

	// --- prepared transactions ---
	#[fail(display = "prepared transaction has expired; its inputs moved")]
	PreparedTransactionExpired,
	#[fail(display = "prepared transaction not found")]
	PreparedTransactionNotFound,

	// --- logic / programmer errors ---
	#[fail(display = "address does not belong to this wallet")]
	AddressNotInWallet,
	#[fail(display = "operation is illegal on a view-only wallet")]
	IllegalViewWalletOperation,
	#[fail(display = "operation requires a view-only wallet")]
	IllegalNonViewWalletOperation,
	#[fail(display = "subwallet with public spend key '{}' already exists", 0)]
	SubwalletAlreadyExists(String),
	#[fail(display = "the primary subwallet cannot be deleted")]
	CannotDeletePrimarySubwallet,
	#[fail(display = "private key for transaction '{}' not found", 0)]
	TxPrivateKeyNotFound(String),

	// --- fatal: programmer / malicious-node conditions ---
	#[fail(
		display = "gap in block hash sequence: expected height {}, got {} (possibly malicious node)",
		expected, got
	)]
	BlockHashSequenceGap { expected: u64, got: u64 },
	#[fail(display = "node did not return a global index for transaction '{}'", 0)]
	MissingGlobalIndex(String),
	#[fail(display = "generated an invalid key image")]
	InvalidKeyImage,

	#[fail(display = "{}", 0)]
	Generic(String),
}
