//! File upload state machine: `Init → Chunk(n) → … → FinalChunk → Done`, coordinated via
//! `Range`/`Content-Range` headers so a potentially multi-gigabyte file never has to be
//! buffered whole.

// std
use std::{fs::File, io::Read};
// self
use crate::{
	_prelude::*,
	compose::{self, Bearer, ContentType},
	http::{HttpEngine, HttpRequest, Method},
};

/// Progress marker for a chunked file upload. Every non-final chunk requires exactly a
/// `200` response to continue; any other status transitions to `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
	/// No chunk sent yet.
	Init,
	/// `n` bytes sent so far, more remain.
	Chunk(u64),
	/// The last chunk is in flight.
	FinalChunk,
	/// All chunks acknowledged.
	Done,
	/// A chunk was rejected or the transport failed.
	Failed,
}

/// Drives one chunked file upload against `url`, reading sequentially from `local_path`.
pub async fn upload_file<E: HttpEngine>(
	engine: &E,
	url: Url,
	bearer: &str,
	user_agent_comment: &str,
	local_path: &std::path::Path,
	chunk_size: u32,
) -> Result<ChunkState> {
	let mut file = File::open(local_path)
		.map_err(|e| Error::Fail { reason: format!("Failed to open {}: {e}.", local_path.display()) })?;
	let total_len = file
		.metadata()
		.map_err(|e| Error::Fail { reason: format!("Failed to stat {}: {e}.", local_path.display()) })?
		.len();

	if total_len == 0 {
		return Ok(ChunkState::Done);
	}

	let mut sent: u64 = 0;
	let mut buf = vec![0u8; chunk_size as usize];
	let mut state = ChunkState::Init;

	loop {
		let read_len =
			file.read(&mut buf).map_err(|e| Error::Fail { reason: format!("Read failed: {e}.") })?;

		if read_len == 0 {
			break;
		}

		let range_end = sent + read_len as u64 - 1;
		let is_final = sent + read_len as u64 >= total_len;

		state = if is_final { ChunkState::FinalChunk } else { ChunkState::Chunk(sent) };

		let headers = compose::standard_headers(
			Some(Bearer::AccessToken(bearer)),
			user_agent_comment,
			true,
			Some(ContentType::OctetStream),
		);
		let mut request = HttpRequest::new(Method::Put, url.clone())
			.header("Content-Range", format!("bytes {sent}-{range_end}/{total_len}"))
			.with_bytes_body(buf[..read_len].to_vec());

		for (name, value) in headers.pairs {
			request = request.header(name, value);
		}

		let response = engine.send(request).await?;
		let response = compose::check_status(response, |_| String::new())?;

		if is_final {
			if response.status != 200 && response.status != 201 {
				return Err(Error::Fail {
					reason: format!("Unexpected status {} on final chunk.", response.status),
				});
			}

			state = ChunkState::Done;

			break;
		} else if response.status != 200 {
			return Err(Error::Fail {
				reason: format!("Unexpected status {} on intermediate chunk.", response.status),
			});
		}

		sent += read_len as u64;
	}

	Ok(state)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn chunk_state_distinguishes_progress_markers() {
		assert_ne!(ChunkState::Init, ChunkState::Done);
		assert_eq!(ChunkState::Chunk(10), ChunkState::Chunk(10));
		assert_ne!(ChunkState::Chunk(10), ChunkState::Chunk(20));
	}
}
