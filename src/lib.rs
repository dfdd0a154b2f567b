/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    TAPWAVE is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    TAPWAVE is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
/*! TAPWAVE converts between the two ways a Commodore cassette recording can live on disk:
the pulse-duration **TAP** tape image and the sampled PCM **WAV** waveform.

Two pipelines share a common core:

* [convert::tap_to_wav] expands *TAP* pulses into half-waves ([tap::pulse::TapPulseIter])
  and synthesizes a square-wave signal ([audio::synth::WaveformSynth]), optionally
  DC-filtered ([audio::filter::DcFilter]) or packed to 1 bit per sample.
* [convert::wav_to_tap] detects the logic-level signal in sampled audio
  ([audio::decode::WaveformDecoder], five selectable methods) and re-encodes the time
  between signal edges as *TAP* pulses ([tap::pulse::PulseDecodeWriter]), with optional
  tape splitting across files on pulse overflow ([tap::ChunkedTapWriter]).

Both directions operate on fully buffered input; nothing is streamed or concurrent.

```no_run
use tapwave::{tap_to_wav, SynthOptions};

let tap = std::fs::File::open("game.tap")?;
let wav = std::fs::File::create("game.wav")?;
let summary = tap_to_wav(tap, wav, &SynthOptions::default())?;
println!("{} samples written", summary.samples);
# Ok::<(), std::io::Error>(())
```
*/
pub mod audio;
pub mod convert;
pub mod tap;
pub mod wav;

pub use audio::synth::SynthOptions;
pub use convert::{tap_to_wav, wav_to_tap, wav_to_tap_file, DecodeOptions, TapSummary, WavSummary};
