//! MIDI dispatch.  Each MIDI channel drives the voice with the same index,
//! so a patch with N voices responds on channels 1 through N.

use wmidi::MidiMessage;

use crate::synth::Synth;

impl Synth {
    /// Handle a MIDI message.  Note on starts a note on the voice matching
    /// the message's channel; note off (or note on with zero velocity)
    /// releases it, but only if that voice is still playing the same note.
    ///
    /// Returns true if the message changed the state of a voice.  Any other
    /// message is ignored.
    pub fn handle_midi(&mut self, msg: &MidiMessage) -> bool {
        match *msg {
            MidiMessage::NoteOn(ch, note, vel) if u8::from(vel) > 0 => {
                self.note_on(ch.index() as usize, u8::from(note))
            }
            MidiMessage::NoteOn(ch, note, _) | MidiMessage::NoteOff(ch, note, _) => {
                self.release_note(ch.index() as usize, u8::from(note))
            }
            _ => false,
        }
    }

    fn release_note(&mut self, voice: usize, note: u8) -> bool {
        match self.voice(voice) {
            Some(v) if v.gate() && v.note() == note => self.note_off(voice),
            _ => false,
        }
    }
}
