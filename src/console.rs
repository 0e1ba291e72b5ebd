//! Line-oriented console front end: a triage dialogue, then an optional
//! booking. Generic over the reader and writer so tests can script it.

use std::io::{self, BufRead, Write};

use chrono::NaiveDate;

use crate::directory::{DoctorDirectory, SlotLedger, TerminologyLookup};
use crate::pipeline::booking::{
    check_availability, AvailabilityQuery, BookingMachine, BookingState, Confirmation,
};
use crate::pipeline::generation::TextProvider;
use crate::pipeline::triage::{format_doctor_list, DialogueAction, DialogueController, TriageReport, TriageSession};

pub const GREETING: &str = "Hi, I'm here to help. Tell me how you're feeling today.";
const BOOKING_OFFER: &str = "Would you like to book an appointment? (yes/no) ";
const SAVE_REPORT_OFFER: &str = "Phone number to save this report (leave blank to skip): ";

/// Next trimmed line, or `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> io::Result<Option<String>> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn print_action<W: Write>(output: &mut W, action: &DialogueAction) -> io::Result<()> {
    writeln!(output, "{}", action.reply_text())?;
    if let Some(question) = action.follow_up_question() {
        writeln!(output, "{question}")?;
    }
    // Urgent summaries carry doctors without listing them in the reply.
    if action.is_emergency() && action.is_terminal() {
        if let Some(doctors) = action.recommended_doctors().filter(|d| !d.is_empty()) {
            writeln!(output, "{}", format_doctor_list(action.specialist(), doctors))?;
        }
    }
    Ok(())
}

/// Runs turns until the session ends, the user quits, or input runs out.
/// Returns the last action taken.
pub fn run_triage<P, T, D, R, W>(
    controller: &DialogueController<'_, P, T, D>,
    session: &mut TriageSession,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<DialogueAction>>
where
    P: TextProvider,
    T: TerminologyLookup,
    D: DoctorDirectory,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{GREETING}")?;
    let mut last = None;

    while !session.is_terminal() {
        let Some(line) = prompt(input, output, "> ")? else {
            break;
        };
        if line.is_empty() {
            continue;
        }
        if matches!(line.to_lowercase().as_str(), "quit" | "exit") {
            break;
        }
        match controller.handle_turn(session, &line) {
            Ok(action) => {
                print_action(output, &action)?;
                last = Some(action);
            }
            Err(e) => writeln!(output, "{e}")?,
        }
    }
    Ok(last)
}

/// Asks whether to book, collects the details, and runs the booking flow
/// through its confirmation step. `None` when the user skips booking.
pub fn run_booking<D, L, R, W>(
    directory: &D,
    ledger: &L,
    today: NaiveDate,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<BookingState>>
where
    D: DoctorDirectory,
    L: SlotLedger,
    R: BufRead,
    W: Write,
{
    match prompt(input, output, BOOKING_OFFER)? {
        Some(answer) if Confirmation::from_answer(&answer) == Confirmation::Confirmed => {}
        _ => return Ok(None),
    }

    let Some(doctor) = prompt(input, output, "Doctor's name: ")? else {
        return Ok(None);
    };
    let query = AvailabilityQuery {
        name: Some(doctor.trim_start_matches("Dr.").trim().to_string()),
        ..Default::default()
    };
    writeln!(output, "{}", check_availability(directory, ledger, &query, today))?;

    let mut fields = Vec::with_capacity(4);
    for label in ["Date (YYYY-MM-DD): ", "Time (HH:MM): ", "Your name: ", "Phone: "] {
        fields.push(prompt(input, output, label)?.unwrap_or_default());
    }
    let [date, time, user_name, phone]: [String; 4] = match fields.try_into() {
        Ok(fields) => fields,
        Err(_) => return Ok(None),
    };

    let machine = BookingMachine::new(directory, ledger);
    let mut state = machine.run(BookingState {
        date,
        time,
        user_name,
        phone,
        ..BookingState::new(&doctor)
    });
    writeln!(output, "{}", state.response)?;

    let awaiting_answer = state.error.is_none()
        && !state.is_booked()
        && !state.date.is_empty()
        && !state.time.is_empty();
    if awaiting_answer {
        let answer = prompt(input, output, "> ")?.unwrap_or_default();
        state.confirmed = match Confirmation::from_answer(&answer) {
            Confirmation::Unset => Confirmation::Declined,
            answered => answered,
        };
        state = machine.run(state);
        writeln!(output, "{}", state.response)?;
    }
    Ok(Some(state))
}

/// Phone number to save the report under. `None` when left blank.
pub fn ask_phone<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Option<String>> {
    Ok(prompt(input, output, SAVE_REPORT_OFFER)?.filter(|phone| !phone.is_empty()))
}

pub fn print_report<W: Write>(output: &mut W, report: &TriageReport) -> io::Result<()> {
    writeln!(output, "\n── Summary ──")?;
    writeln!(output, "{}", report.summary)?;
    if !report.symptoms.is_empty() {
        writeln!(output, "Symptoms: {}", report.symptoms.join(", "))?;
    }
    writeln!(output, "Suggested specialist: {}", report.specialist)?;
    writeln!(output, "Urgency: {:?}", report.urgency)
}

pub fn print_health_summary<W: Write>(output: &mut W, summary: &str) -> io::Result<()> {
    writeln!(output, "\n── Your health so far ──")?;
    writeln!(output, "{summary}")
}
