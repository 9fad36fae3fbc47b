//! Static configuration of the task image
//!
//! These mirror the build-time configuration of the embedded target: every
//! table is sized here and nothing grows at run time.

use kernel_api::EXCHANGE_PAYLOAD_LEN;

/// Maximum number of tasks a queue table can be bound to
pub const MAX_TASKS: usize = 8;

/// Number of threads per task, one errno slot each
pub const MAX_THREADS_PER_TASK: usize = 4;

/// Capacity of each timer table (postponed entries included)
pub const TIMER_MAX: usize = 5;

/// Number of message-queue slots
pub const MSGQ_MAX: usize = MAX_TASKS;

/// Reassembly buffer of one queue slot, type tag included
pub const MSGQ_BUFFER_LEN: usize = 256;

/// Size of the type tag heading every message
pub const MSG_TAG_LEN: usize = 4;

/// Largest message text accepted by `msgsnd`
pub const MSG_MAX_SIZE: usize = MSGQ_BUFFER_LEN - MSG_TAG_LEN;

/// Size of one IPC chunk on the wire
pub const MSG_CHUNK_LEN: usize = EXCHANGE_PAYLOAD_LEN;

/// Permission given to new queues (unicast, the kernel checks access)
pub const MSG_PERM_DEFAULT: u16 = 0o666;

/// Permission of a receive-only queue
pub const MSG_PERM_READ_ONLY: u16 = 0o444;

/// Number of signals the kernel delivers
pub const SIGNUM: usize = 12;

/// Largest request `getrandom` serves in one call
pub const GETRANDOM_MAX: usize = 65_535;
