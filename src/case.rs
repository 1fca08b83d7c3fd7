//! Clinical case definition.
//!
//! A [`CaseDefinition`] bundles everything case-specific: the patient
//! profile, the persona prompt driving the chat model, the fixed
//! per-category data-generation prompts, the evaluation rubric, and the
//! portrait prompt. The simulation core is case-agnostic; swapping the
//! case swaps the whole scenario.

use crate::sim::store::DataCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

/// Static descriptive record for the patient. Configuration only; never
/// mutated at runtime.
#[derive(Debug, Clone)]
pub struct PatientProfile {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub location: String,
    pub occupation: String,
}

/// A complete training scenario.
#[derive(Debug, Clone)]
pub struct CaseDefinition {
    pub profile: PatientProfile,
    /// System instruction for the conversational patient persona.
    pub persona_prompt: String,
    /// Fixed data-generation prompts, one per category.
    history_prompt: String,
    exam_prompt: String,
    labs_prompt: String,
    imaging_prompt: String,
    /// Rubric prepended to the student's submission for scoring.
    pub evaluation_prompt: String,
    /// Prompt for the patient portrait image.
    pub portrait_prompt: String,
    /// Opening system briefing shown before the first question.
    pub briefing: String,
}

impl CaseDefinition {
    /// The fixed data-generation prompt for a category.
    pub fn data_prompt(&self, category: DataCategory) -> &str {
        match category {
            DataCategory::History => &self.history_prompt,
            DataCategory::Exam => &self.exam_prompt,
            DataCategory::Labs => &self.labs_prompt,
            DataCategory::Imaging => &self.imaging_prompt,
        }
    }

    /// Prebuilt synthesis voice for the patient, selected by gender.
    pub fn voice_name(&self) -> &'static str {
        match self.profile.gender {
            Gender::Male => "Kore",
            Gender::Female => "Puck",
        }
    }

    /// The bundled acute-appendicitis teaching case.
    pub fn appendicitis() -> Self {
        let profile = PatientProfile {
            name: "Arjun Nair".to_string(),
            age: 22,
            gender: Gender::Male,
            location: "Mumbai, India".to_string(),
            occupation: "Student".to_string(),
        };

        let persona_prompt = "\
You are a virtual patient for a medical student to practice their diagnostic skills, based on a case from a surgical textbook. Your name is Arjun Nair, you are a 22-year-old male from Mumbai, India.
You are in the emergency department with a classic presentation of acute appendicitis.
Your role is to respond to the student's questions from a patient's perspective. DO NOT act like a doctor or use medical jargon.

Here is your story, based on the textbook's description of a classic presentation:
- The pain started about 18 hours ago. At first, it was a vague, dull pain right around my belly button.
- Over the last few hours, the pain has moved down to the lower right side of my abdomen. It's a sharp, constant pain now, and much worse than before.
- It hurts to move, and I've been trying to lie as still as possible. Coughing is very painful.
- I have no appetite at all. The thought of pav bhaji or any food makes me feel sick.
- I feel nauseous and vomited once this morning.
- I feel feverish and warm.
- Past medical history: No chronic illnesses, no previous surgeries.
- Medications: I take paracetamol sometimes for headaches, but I haven't taken anything for this pain.
- Allergies: No known drug allergies.
- Social history: I'm a college student in Mumbai. I drink socially on weekends, don't smoke, and don't use recreational drugs.

Interaction rules:
1.  Only answer the questions asked. Do not volunteer information.
2.  Keep your answers concise and believable for a person in significant pain.
3.  If the student asks to perform a physical examination, respond ONLY with the text: \"[UNLOCK_EXAM]\".
4.  If the student asks for lab results or blood work, respond ONLY with the text: \"[UNLOCK_LABS]\".
5.  If the student asks for a CT scan, X-ray, or any imaging, respond ONLY with the text: \"[UNLOCK_IMAGING]\".
6.  For any other question, respond naturally as Arjun.
"
        .to_string();

        let history_prompt = "Generate a professional, structured Medical History Chart for Arjun Nair (22M). Use Markdown headers and tables. Include: Chief Complaint, History of Present Illness (with timeline), Past Medical History, Medications, Allergies, and Social/Family History. Ensure it matches the persona of a college student from Mumbai with acute abdominal pain starting 18 hours ago.".to_string();

        let exam_prompt = "Based on the provided surgical textbook, generate a typical physical examination report for a 22-year-old Indian male named Arjun Nair with classic acute uncomplicated appendicitis. The patient should appear ill and be lying still. Include vital signs showing tachycardia and a low-grade fever (e.g., 38.2\u{b0}C). The abdominal exam must detail tenderness and guarding over McBurney's point, positive rebound tenderness, a positive Rovsing's sign, and a positive psoas sign. Format it clearly using markdown.".to_string();

        let labs_prompt = "Based on the provided surgical textbook, generate typical laboratory results for a 22-year-old male with acute appendicitis. Include a Complete Blood Count (CBC) showing leukocytosis (WBC > 10,000/mcL) with a 'left shift' (neutrophilia). Also include an elevated C-Reactive Protein (CRP). Format it as a professional lab report table using markdown.".to_string();

        let imaging_prompt = "Based on the provided surgical textbook, generate a concise report of an abdominal CT scan confirming acute appendicitis. The report must describe a distended appendix with a diameter greater than 7mm, wall thickening with mural enhancement (a 'target sign'), and significant periappendiceal fat stranding. State there is no evidence of perforation or abscess. Format it as a radiology report using markdown.".to_string();

        let evaluation_prompt = "\
You are a senior surgical attending physician evaluating a medical student's performance on a case of Acute Uncomplicated Appendicitis.
Your evaluation MUST strictly adhere to standard surgical textbooks (e.g., Sabiston, Schwartz).

GOLD STANDARD CARE CHECKLIST:
1. DIAGNOSIS: Correct identification of Acute Appendicitis.
2. NPO STATUS: Explicitly ordering \"Nothing by Mouth\" to prepare for surgery and prevent aspiration.
3. IV FLUIDS: Ordering isotonic fluid resuscitation (e.g., Normal Saline or Lactated Ringer's) to address dehydration and electrolyte imbalance.
4. ANTIBIOTICS: Ordering prophylactic IV antibiotics covering gram-negative and anaerobic organisms (e.g., Cefoxitin, Cefotetan, or Ciprofloxacin+Metronidazole).
5. SURGICAL PLAN: Proposing Laparoscopic (preferably) or Open Appendectomy.
6. ANALGESIA: Providing appropriate pain management.

Analyze the student's submission. Be critical but educational.
If they missed NPO or Antibiotics, they cannot receive a score higher than 70.
If they missed the diagnosis entirely, the score must be below 40.
Provide a \"Surgical Pearl\" - a high-level educational tip related to the pathophysiology or management of this specific case.
"
        .to_string();

        let portrait_prompt = "Photorealistic medical portrait of Arjun, a 22-year-old young man from India. He has dark hair, brown eyes, and tan skin. He looks visibly unwell, pale, and in significant discomfort, holding his lower abdomen. Professional clinical photography style, emergency room background, realistic textures.".to_string();

        let briefing = "You are in the emergency department. Your patient is Arjun Nair, a 22-year-old male who has come in with abdominal pain. Please begin your consultation.".to_string();

        Self {
            profile,
            persona_prompt,
            history_prompt,
            exam_prompt,
            labs_prompt,
            imaging_prompt,
            evaluation_prompt,
            portrait_prompt,
            briefing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appendicitis_profile() {
        let case = CaseDefinition::appendicitis();
        assert_eq!(case.profile.name, "Arjun Nair");
        assert_eq!(case.profile.age, 22);
        assert_eq!(case.profile.gender, Gender::Male);
    }

    #[test]
    fn male_patient_uses_kore_voice() {
        let case = CaseDefinition::appendicitis();
        assert_eq!(case.voice_name(), "Kore");
    }

    #[test]
    fn female_patient_uses_puck_voice() {
        let mut case = CaseDefinition::appendicitis();
        case.profile.gender = Gender::Female;
        assert_eq!(case.voice_name(), "Puck");
    }

    #[test]
    fn every_category_has_a_distinct_prompt() {
        let case = CaseDefinition::appendicitis();
        let prompts: Vec<&str> = DataCategory::ALL
            .iter()
            .map(|c| case.data_prompt(*c))
            .collect();
        for p in &prompts {
            assert!(!p.is_empty());
        }
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert_ne!(prompts[2], prompts[3]);
    }

    #[test]
    fn persona_prompt_names_the_unlock_tokens() {
        let case = CaseDefinition::appendicitis();
        assert!(case.persona_prompt.contains("[UNLOCK_EXAM]"));
        assert!(case.persona_prompt.contains("[UNLOCK_LABS]"));
        assert!(case.persona_prompt.contains("[UNLOCK_IMAGING]"));
    }
}
